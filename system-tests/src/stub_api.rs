// system-tests/src/stub_api.rs
// ============================================================================
// Module: Stub JSON API
// Description: Minimal JSON API server over the SQLite fixture store.
// Purpose: Give feature scenarios a real HTTP endpoint to assert against.
// Dependencies: jsonapi-steps-core, jsonapi-steps-store-sqlite, tiny_http
// ============================================================================

//! ## Overview
//! The stub serves read-only JSON API documents for the fixture kinds:
//! `/related_dummies`, `/dummy_friends`, `/circular_references` and their
//! `/{id}` members. `/dummies` is a collection that is always empty and
//! `/malformed` answers a document that breaks the JSON API schema. Unknown
//! routes answer `404` and non-`GET` methods answer `405`, both with an
//! `errors` document. The store is reopened per request so rows flushed by
//! the scenario are visible immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use jsonapi_steps_core::FixtureKind;
use jsonapi_steps_store_sqlite::SqliteFixtureStore;
use jsonapi_steps_store_sqlite::SqliteStoreConfig;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of every stub response.
const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Running stub server; stops when dropped.
pub struct StubApi {
    /// Base URL with trailing slash.
    base_url: String,
    /// Shared server so `Drop` can unblock the accept loop.
    server: Arc<Server>,
    /// Accept loop thread.
    join: Option<JoinHandle<()>>,
}

impl StubApi {
    /// Starts the stub on an ephemeral local port.
    ///
    /// # Errors
    ///
    /// Returns a message when the listener cannot be bound.
    pub fn spawn(db_path: &Path) -> Result<Self, String> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|err| format!("stub api bind failed: {err}"))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| "stub api has no ip address".to_string())?;
        let server = Arc::new(server);
        let loop_server = Arc::clone(&server);
        let db_path = db_path.to_path_buf();
        let join = thread::spawn(move || serve(&loop_server, &db_path));
        Ok(Self {
            base_url: format!("http://{addr}/"),
            server,
            join: Some(join),
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for StubApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubApi").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

// ============================================================================
// SECTION: Serving
// ============================================================================

/// Accept loop; returns once the server is unblocked.
fn serve(server: &Server, db_path: &Path) {
    for request in server.incoming_requests() {
        let (status, document) = route(request.method(), request.url(), db_path);
        let mut response = Response::from_string(document.to_string()).with_status_code(status);
        if let Ok(header) = Header::from_bytes("Content-Type", JSON_API_MEDIA_TYPE) {
            response = response.with_header(header);
        }
        let _ = request.respond(response);
    }
}

/// Maps a request to a status code and JSON API document.
fn route(method: &Method, url: &str, db_path: &Path) -> (u16, Value) {
    if *method != Method::Get {
        return (405, error_document(405, "Method Not Allowed", "the stub api is read-only"));
    }
    let path = url.split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    let result = match segments.as_slice() {
        ["dummies"] => Ok(Some(collection(Vec::new()))),
        ["malformed"] => Ok(Some(json!({"data": {"type": "Malformed", "id": 1}}))),
        [collection_name] => kind_for(collection_name)
            .map_or(Ok(None), |kind| list(db_path, kind).map(|items| Some(collection(items)))),
        [collection_name, id] => match (kind_for(collection_name), id.parse::<i64>()) {
            (Some(kind), Ok(id)) => {
                member(db_path, kind, id).map(|item| item.map(|data| json!({"data": data})))
            }
            _ => Ok(None),
        },
        _ => Ok(None),
    };
    match result {
        Ok(Some(document)) => (200, document),
        Ok(None) => (404, error_document(404, "Not Found", &format!("no route for {path}"))),
        Err(message) => (500, error_document(500, "Internal Server Error", &message)),
    }
}

/// Resolves a collection name to its fixture kind.
fn kind_for(collection_name: &str) -> Option<FixtureKind> {
    match collection_name {
        "related_dummies" => Some(FixtureKind::RelatedDummy),
        "dummy_friends" => Some(FixtureKind::DummyFriend),
        "circular_references" => Some(FixtureKind::CircularReference),
        _ => None,
    }
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Opens the fixture store at `db_path`.
fn open_store(db_path: &Path) -> Result<SqliteFixtureStore, String> {
    SqliteFixtureStore::new(SqliteStoreConfig::new(db_path)).map_err(|err| err.to_string())
}

/// Loads every resource of `kind`.
fn list(db_path: &Path, kind: FixtureKind) -> Result<Vec<Value>, String> {
    let store = open_store(db_path)?;
    let ids = store.ids(kind).map_err(|err| err.to_string())?;
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = load_resource(&store, kind, id)? {
            items.push(item);
        }
    }
    Ok(items)
}

/// Loads one resource of `kind`.
fn member(db_path: &Path, kind: FixtureKind, id: i64) -> Result<Option<Value>, String> {
    let store = open_store(db_path)?;
    load_resource(&store, kind, id)
}

/// Renders the stored row for `id` as a resource object.
fn load_resource(
    store: &SqliteFixtureStore,
    kind: FixtureKind,
    id: i64,
) -> Result<Option<Value>, String> {
    let resource = match kind {
        FixtureKind::RelatedDummy => store.load_related_dummy(id).map(|row| {
            row.map(|dummy| {
                json!({
                    "type": kind.as_str(),
                    "id": id.to_string(),
                    "attributes": {"_id": id, "name": dummy.name},
                    "relationships": {"relatedToDummyFriend": {"data": []}},
                })
            })
        }),
        FixtureKind::DummyFriend => store.load_dummy_friend(id).map(|row| {
            row.map(|friend| {
                json!({
                    "type": kind.as_str(),
                    "id": id.to_string(),
                    "attributes": {"_id": id, "name": friend.name},
                })
            })
        }),
        FixtureKind::CircularReference => store.load_circular_reference(id).map(|row| {
            row.map(|node| {
                let parent = node.parent_id.map_or(Value::Null, |parent| linkage(kind, parent));
                let children: Vec<Value> =
                    node.children.iter().map(|child| linkage(kind, *child)).collect();
                json!({
                    "type": kind.as_str(),
                    "id": id.to_string(),
                    "attributes": {"_id": id},
                    "relationships": {
                        "parent": {"data": parent},
                        "children": {"data": children},
                    },
                })
            })
        }),
    };
    resource.map_err(|err| err.to_string())
}

/// Builds a resource identifier object.
fn linkage(kind: FixtureKind, id: i64) -> Value {
    json!({"type": kind.as_str(), "id": id.to_string()})
}

/// Wraps resources in a collection document.
fn collection(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({"data": items, "meta": {"totalItems": total}})
}

/// Builds a single-error document.
fn error_document(status: u16, title: &str, detail: &str) -> Value {
    json!({
        "errors": [{"status": status.to_string(), "title": title, "detail": detail}],
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
