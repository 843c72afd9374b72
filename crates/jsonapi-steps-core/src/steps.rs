// crates/jsonapi-steps-core/src/steps.rs
// ============================================================================
// Module: Step Phrases
// Description: Scenario phrase catalog and phrase-to-step parsing.
// Purpose: Bind human-readable step text to helper operations.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`step_definitions`] lists the phrases the helper understands. A phrase
//! may contain one `:node` placeholder, which matches a double-quoted
//! argument or a single bare token. [`parse_step`] strips a leading
//! `Given`/`When`/`Then`/`And`/`But` keyword and returns the matching
//! [`Step`]; runners that bring their own matching can build [`Step`] values
//! directly.

use thiserror::Error;

use crate::fixtures::FixtureKind;

/// Placeholder for the node argument inside a phrase.
const NODE_PLACEHOLDER: &str = ":node";
/// Keywords stripped from the start of a step line.
const KEYWORDS: [&str; 5] = ["Given ", "When ", "Then ", "And ", "But "];

/// Phrase parse errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepParseError {
    /// No definition matches the phrase.
    #[error("no step definition matches `{0}`")]
    UnknownStep(String),
}

/// Step keyword a definition is declared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKeyword {
    /// Setup step.
    Given,
    /// Outcome step.
    Then,
}

/// Parsed scenario step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The JSON should be valid according to the JSON API schema.
    JsonIsValid,
    /// The JSON node should be an empty array.
    NodeIsEmptyArray(String),
    /// The JSON node should be a number.
    NodeIsNumber(String),
    /// The JSON node should not be an empty string.
    NodeIsNotEmptyString(String),
    /// There is a fixture of the given kind.
    ThereIs(FixtureKind),
}

impl Step {
    /// Returns the operation label used in audit records.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::JsonIsValid => "validate_against_schema",
            Self::NodeIsEmptyArray(_) => "assert_node_is_empty_array",
            Self::NodeIsNumber(_) => "assert_node_is_number",
            Self::NodeIsNotEmptyString(_) => "assert_node_is_non_empty_string",
            Self::ThereIs(_) => "create_fixture",
        }
    }

    /// Returns the node argument, when the step takes one.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::NodeIsEmptyArray(node)
            | Self::NodeIsNumber(node)
            | Self::NodeIsNotEmptyString(node) => Some(node.as_str()),
            Self::JsonIsValid | Self::ThereIs(_) => None,
        }
    }

    /// Returns the fixture kind, for fixture steps.
    #[must_use]
    pub const fn fixture(&self) -> Option<FixtureKind> {
        match self {
            Self::ThereIs(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Phrase bound to a step constructor.
#[derive(Debug, Clone, Copy)]
pub struct StepDefinition {
    /// Declared keyword.
    pub keyword: StepKeyword,
    /// Phrase text, with at most one `:node` placeholder.
    pub phrase: &'static str,
    /// Builds the step from the placeholder argument (empty when absent).
    build: fn(String) -> Step,
}

impl StepDefinition {
    /// Matches `text` against the phrase.
    #[must_use]
    pub fn matches(&self, text: &str) -> Option<Step> {
        let Some((prefix, suffix)) = self.phrase.split_once(NODE_PLACEHOLDER) else {
            return (self.phrase == text).then(|| (self.build)(String::new()));
        };
        if text.len() < prefix.len() + suffix.len() {
            return None;
        }
        let argument = text.strip_prefix(prefix)?.strip_suffix(suffix)?;
        parse_argument(argument).map(self.build)
    }
}

/// Phrase catalog.
static DEFINITIONS: [StepDefinition; 7] = [
    StepDefinition {
        keyword: StepKeyword::Then,
        phrase: "the JSON should be valid according to the JSON API schema",
        build: |_| Step::JsonIsValid,
    },
    StepDefinition {
        keyword: StepKeyword::Then,
        phrase: "the JSON node :node should be an empty array",
        build: Step::NodeIsEmptyArray,
    },
    StepDefinition {
        keyword: StepKeyword::Then,
        phrase: "the JSON node :node should be a number",
        build: Step::NodeIsNumber,
    },
    StepDefinition {
        keyword: StepKeyword::Then,
        phrase: "the JSON node :node should not be an empty string",
        build: Step::NodeIsNotEmptyString,
    },
    StepDefinition {
        keyword: StepKeyword::Given,
        phrase: "there is a RelatedDummy",
        build: |_| Step::ThereIs(FixtureKind::RelatedDummy),
    },
    StepDefinition {
        keyword: StepKeyword::Given,
        phrase: "there is a DummyFriend",
        build: |_| Step::ThereIs(FixtureKind::DummyFriend),
    },
    StepDefinition {
        keyword: StepKeyword::Given,
        phrase: "there is a CircularReference",
        build: |_| Step::ThereIs(FixtureKind::CircularReference),
    },
];

/// Returns the phrase catalog.
#[must_use]
pub fn step_definitions() -> &'static [StepDefinition] {
    &DEFINITIONS
}

/// Parses a step line into a [`Step`].
///
/// # Errors
///
/// Returns [`StepParseError::UnknownStep`] when no phrase matches.
pub fn parse_step(text: &str) -> Result<Step, StepParseError> {
    let trimmed = text.trim();
    let phrase = KEYWORDS
        .iter()
        .find_map(|keyword| trimmed.strip_prefix(*keyword))
        .map_or(trimmed, str::trim_start);
    DEFINITIONS
        .iter()
        .find_map(|definition| definition.matches(phrase))
        .ok_or_else(|| StepParseError::UnknownStep(trimmed.to_string()))
}

/// Extracts a placeholder argument: a quoted string or one bare token.
fn parse_argument(argument: &str) -> Option<String> {
    if let Some(quoted) = argument.strip_prefix('"') {
        let inner = quoted.strip_suffix('"')?;
        if inner.contains('"') {
            return None;
        }
        return Some(inner.to_string());
    }
    if argument.is_empty() || argument.contains(char::is_whitespace) {
        return None;
    }
    Some(argument.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::Step;
    use super::StepParseError;
    use super::parse_step;
    use super::step_definitions;
    use crate::fixtures::FixtureKind;

    #[test]
    fn parses_quoted_and_bare_node_arguments() {
        assert_eq!(
            parse_step("Then the JSON node \"data.relationships\" should be an empty array")
                .unwrap(),
            Step::NodeIsEmptyArray("data.relationships".to_string())
        );
        assert_eq!(
            parse_step("And the JSON node data.id should be a number").unwrap(),
            Step::NodeIsNumber("data.id".to_string())
        );
        assert_eq!(
            parse_step("the JSON node \"\" should not be an empty string").unwrap(),
            Step::NodeIsNotEmptyString(String::new())
        );
    }

    #[test]
    fn parses_fixture_and_schema_phrases() {
        assert_eq!(
            parse_step("Given there is a CircularReference").unwrap(),
            Step::ThereIs(FixtureKind::CircularReference)
        );
        assert_eq!(
            parse_step("Then the JSON should be valid according to the JSON API schema").unwrap(),
            Step::JsonIsValid
        );
    }

    #[test]
    fn audit_fields_follow_the_step() {
        let step = Step::NodeIsNumber("data.id".to_string());
        assert_eq!(step.label(), "assert_node_is_number");
        assert_eq!(step.node(), Some("data.id"));
        assert_eq!(step.fixture(), None);

        let step = Step::ThereIs(FixtureKind::DummyFriend);
        assert_eq!(step.label(), "create_fixture");
        assert_eq!(step.node(), None);
        assert_eq!(step.fixture(), Some(FixtureKind::DummyFriend));
    }

    #[test]
    fn rejects_unknown_phrases() {
        for text in [
            "Given there is a Dummy",
            "Then the JSON node data id should be a number",
            "Then the JSON node should be a number",
        ] {
            assert!(matches!(parse_step(text), Err(StepParseError::UnknownStep(_))), "{text}");
        }
    }

    #[test]
    fn catalog_lists_every_phrase_once() {
        let phrases: Vec<&str> = step_definitions().iter().map(|def| def.phrase).collect();
        assert_eq!(phrases.len(), 7);
        let mut unique = phrases.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), phrases.len());
    }
}
