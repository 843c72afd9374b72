// system-tests/tests/jsonapi_features.rs
// ============================================================================
// Module: JSON API Feature Suite
// Description: Cucumber runner for the Gherkin features in tests/features.
// Purpose: Exercise the step library end to end over HTTP and SQLite.
// Dependencies: cucumber, futures, jsonapi-steps-config, system-tests
// ============================================================================

//! ## Overview
//! Each scenario gets a temporary directory holding its fixture database and
//! configuration file, a stub JSON API reading that database, and a context
//! assembled from the configuration. Library phrases are forwarded verbatim
//! to [`ConfiguredContext::run_step`]; the remaining steps drive HTTP and
//! check outcomes the library does not phrase itself.

#![allow(
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,
    reason = "Cucumber step signatures take owned captures and return results."
)]

use std::fs;

use cucumber::World;
use cucumber::given;
use cucumber::then;
use cucumber::when;
use jsonapi_steps_config::ConfiguredContext;
use jsonapi_steps_config::JsonApiStepsConfig;
use jsonapi_steps_core::ResponseSource;
use jsonapi_steps_http::Method;
use system_tests::StubApi;
use tempfile::TempDir;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON API schema used by every scenario.
const SCHEMA_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/jsonapi.json");
/// Directory holding the feature files.
const FEATURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/features");

// ============================================================================
// SECTION: World
// ============================================================================

/// Per-scenario state.
#[derive(Debug, Default, World)]
pub struct JsonApiWorld {
    /// Assertion helper wired from the scenario configuration.
    context: Option<ConfiguredContext>,
    /// Stub API; dropped before the workspace.
    api: Option<StubApi>,
    /// Scenario workspace.
    workspace: Option<TempDir>,
}

impl JsonApiWorld {
    /// Returns the scenario context or a setup error.
    fn context(&mut self) -> Result<&mut ConfiguredContext, String> {
        self.context.as_mut().ok_or_else(|| "scenario has no JSON API stub".to_string())
    }

    /// Forwards a library phrase to the context.
    fn run(&mut self, text: &str) -> Result<(), String> {
        self.context()?.run_step(text).map_err(|err| err.to_string())
    }
}

// ============================================================================
// SECTION: Setup Steps
// ============================================================================

/// Starts the stub API and assembles the context from a config file.
#[given("a JSON API stub backed by a fixture database")]
fn start_stub(world: &mut JsonApiWorld) -> Result<(), String> {
    let workspace = TempDir::new().map_err(|err| err.to_string())?;
    let db_path = workspace.path().join("fixtures.sqlite");
    let config_path = workspace.path().join("jsonapi-steps.toml");

    let database = db_path.to_string_lossy();
    let api = StubApi::spawn(&db_path)?;
    let config = format!(
        "[schema]\npath = '{SCHEMA_PATH}'\nmax_ref_depth = 15\n\n[http]\nbase_url = \"{}\"\n\n\
         [store]\ntype = \"sqlite\"\npath = '{database}'\njournal_mode = \"wal\"\n",
        api.base_url()
    );
    fs::write(&config_path, config).map_err(|err| err.to_string())?;
    let context = JsonApiStepsConfig::load(Some(&config_path))
        .and_then(|config| config.build_context())
        .map_err(|err| err.to_string())?;

    world.context = Some(context);
    world.api = Some(api);
    world.workspace = Some(workspace);
    Ok(())
}

/// Forwards fixture phrases.
#[given(regex = r"^(there is a \w+)$")]
fn fixture_step(world: &mut JsonApiWorld, text: String) -> Result<(), String> {
    world.run(&text)
}

/// Sets a header on every following request.
#[given(regex = r#"^I add "([^"]+)" header equal to "([^"]*)"$"#)]
fn add_header(world: &mut JsonApiWorld, name: String, value: String) -> Result<(), String> {
    world.context()?.responses_mut().set_header(&name, &value).map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Request Steps
// ============================================================================

/// Sends a bodiless request.
#[when(regex = r#"^I send a "(GET|DELETE)" request to "([^"]*)"$"#)]
fn send_request(world: &mut JsonApiWorld, method: String, path: String) -> Result<(), String> {
    let method = if method == "GET" { Method::GET } else { Method::DELETE };
    world
        .context()?
        .responses_mut()
        .send(method, &path, None)
        .map(drop)
        .map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Assertion Steps
// ============================================================================

/// Forwards assertion phrases.
#[then(regex = r"^(the JSON .+)$")]
fn assertion_step(world: &mut JsonApiWorld, text: String) -> Result<(), String> {
    world.run(&text)
}

/// Checks the recorded status code.
#[then(regex = r"^the response status code should be (\d{3})$")]
fn status_code(world: &mut JsonApiWorld, expected: u16) -> Result<(), String> {
    let context = world.context()?;
    let actual = context.responses().last_response().map_err(|err| err.to_string())?.status;
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected status {expected}, got {actual}"))
    }
}

/// Runs a library phrase that must fail.
#[then(regex = r"^the step '(.+)' should fail$")]
fn step_fails(world: &mut JsonApiWorld, text: String) -> Result<(), String> {
    match world.context()?.run_step(&text) {
        Err(_) => Ok(()),
        Ok(()) => Err(format!("step `{text}` unexpectedly passed")),
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs every feature file, one scenario at a time.
fn main() {
    futures::executor::block_on(
        JsonApiWorld::cucumber()
            .max_concurrent_scenarios(1)
            .fail_on_skipped()
            .run_and_exit(FEATURES_PATH),
    );
}
