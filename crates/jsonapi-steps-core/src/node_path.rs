// crates/jsonapi-steps-core/src/node_path.rs
// ============================================================================
// Module: Node Paths
// Description: Dotted/indexed addresses for values inside JSON documents.
// Purpose: Compile scenario node paths to JSONPath and evaluate them.
// Dependencies: jsonpath_lib, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`NodePath`] is the address a scenario phrase uses to point into a JSON
//! response, for example `data.attributes.name`, `errors[0].detail` or
//! `root->meta->total`. Paths compile to bracketed `JSONPath` expressions and
//! are evaluated with `jsonpath_lib`.
//!
//! Grammar:
//! - a leading `root` segment is ignored; `root` alone addresses the document;
//! - `->` is an alias for `.`;
//! - bare segments address object members;
//! - all-digit segments, bare or as `[n]`, address index `n` of an array and
//!   the member named `n` of an object;
//! - `[name]`, `["name"]` and `['name']` address members whose key is not a
//!   bare word; quoted digits always address a member.
//!
//! Digit segments are compiled against the shape of the evaluated document,
//! so `data.0` reads `{"data": ["x"]}` and `{"data": {"0": "x"}}` alike.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use jsonpath_lib::select;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Node path parse and evaluation errors.
///
/// # Invariants
/// - [`NodePathError::NotFound`] is the only variant produced for well-formed
///   paths that do not resolve.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodePathError {
    /// The path text is malformed.
    #[error("invalid node path `{path}`: {reason}")]
    Syntax {
        /// Raw path text.
        path: String,
        /// Parse failure reason.
        reason: &'static str,
    },
    /// The path is well formed but addresses nothing in the document.
    #[error("failed to evaluate node path `{0}`")]
    NotFound(String),
    /// The `JSONPath` engine rejected the compiled expression.
    #[error("json path engine rejected `{expression}` for node path `{path}`")]
    Evaluator {
        /// Raw path text.
        path: String,
        /// Compiled `JSONPath` expression.
        expression: String,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// A single node path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member lookup.
    Key(String),
    /// Array index lookup; on objects, the member named by the digits.
    Index(usize),
}

/// Parsed node path.
///
/// # Invariants
/// - `segments` is empty only when the path addresses the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    /// Path text as written in the scenario.
    raw: String,
    /// Parsed segments in document order.
    segments: Vec<PathSegment>,
}

impl NodePath {
    /// Parses a node path.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError::Syntax`] when the path is malformed.
    pub fn parse(raw: &str) -> Result<Self, NodePathError> {
        let normalized = raw.trim().replace("->", ".");
        let body = strip_root(&normalized);
        let segments = parse_segments(raw, body)?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the path text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns true when the path addresses the whole document.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Compiles the path into a bracketed `JSONPath` expression, with digit
    /// segments as array indexes.
    #[must_use]
    pub fn to_jsonpath(&self) -> String {
        let mut expression = String::from("$");
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => push_key(&mut expression, key),
                PathSegment::Index(index) => push_index(&mut expression, *index),
            }
        }
        expression
    }

    /// Compiles the path for `document`: a digit segment becomes a member
    /// lookup wherever the value it applies to is an object.
    #[must_use]
    pub fn to_jsonpath_for(&self, document: &Value) -> String {
        let mut expression = String::from("$");
        let mut current = Some(document);
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => {
                    push_key(&mut expression, key);
                    current = current.and_then(|value| value.get(key));
                }
                PathSegment::Index(index) => {
                    if let Some(Value::Object(map)) = current {
                        let key = index.to_string();
                        push_key(&mut expression, &key);
                        current = map.get(&key);
                    } else {
                        push_index(&mut expression, *index);
                        current = current.and_then(|value| value.get(*index));
                    }
                }
            }
        }
        expression
    }

    /// Evaluates the path against a document.
    ///
    /// # Errors
    ///
    /// Returns [`NodePathError::NotFound`] when nothing matches and
    /// [`NodePathError::Evaluator`] when the engine rejects the expression.
    pub fn evaluate<'a>(&self, document: &'a Value) -> Result<&'a Value, NodePathError> {
        if self.is_root() {
            return Ok(document);
        }
        let expression = self.to_jsonpath_for(document);
        let matches = select(document, &expression).map_err(|_| NodePathError::Evaluator {
            path: self.raw.clone(),
            expression: expression.clone(),
        })?;
        matches.into_iter().next().ok_or_else(|| NodePathError::NotFound(self.raw.clone()))
    }
}

impl FromStr for NodePath {
    type Err = NodePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Strips the optional `root` prefix.
fn strip_root(path: &str) -> &str {
    if path == "root" {
        return "";
    }
    if let Some(rest) = path.strip_prefix("root") {
        if let Some(member) = rest.strip_prefix('.') {
            return member;
        }
        if rest.starts_with('[') {
            return rest;
        }
    }
    path
}

/// Splits a normalized path body into segments.
fn parse_segments(raw: &str, body: &str) -> Result<Vec<PathSegment>, NodePathError> {
    let mut segments = Vec::new();
    let mut rest = body;
    let mut after_dot = false;
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix('[') {
            if after_dot {
                return Err(syntax(raw, "bracket segment cannot follow `.`"));
            }
            let close = inner.find(']').ok_or_else(|| syntax(raw, "unterminated bracket"))?;
            segments.push(parse_bracket(raw, &inner[..close])?);
            rest = &inner[close + 1..];
            continue;
        }
        if let Some(next) = rest.strip_prefix('.') {
            if segments.is_empty() || after_dot {
                return Err(syntax(raw, "empty segment"));
            }
            if next.is_empty() {
                return Err(syntax(raw, "trailing separator"));
            }
            rest = next;
            after_dot = true;
            continue;
        }
        if !segments.is_empty() && !after_dot {
            return Err(syntax(raw, "missing separator after bracket"));
        }
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        segments.push(bare_segment(&rest[..end]));
        rest = &rest[end..];
        after_dot = false;
    }
    Ok(segments)
}

/// Parses the contents of a bracket segment.
fn parse_bracket(raw: &str, inner: &str) -> Result<PathSegment, NodePathError> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(syntax(raw, "empty bracket"));
    }
    for quote in ['"', '\''] {
        if let Some(quoted) = inner.strip_prefix(quote) {
            let key =
                quoted.strip_suffix(quote).ok_or_else(|| syntax(raw, "unterminated quote"))?;
            return Ok(PathSegment::Key(key.to_string()));
        }
    }
    Ok(bare_segment(inner))
}

/// Classifies a bare word as an index or a key; digits with a leading zero
/// stay keys.
fn bare_segment(word: &str) -> PathSegment {
    if word.bytes().all(|byte| byte.is_ascii_digit())
        && let Ok(index) = word.parse::<usize>()
        && index.to_string() == word
    {
        return PathSegment::Index(index);
    }
    PathSegment::Key(word.to_string())
}

/// Appends a quoted member selector.
fn push_key(expression: &mut String, key: &str) {
    expression.push_str("['");
    for ch in key.chars() {
        if ch == '\'' || ch == '\\' {
            expression.push('\\');
        }
        expression.push(ch);
    }
    expression.push_str("']");
}

/// Appends an index selector.
fn push_index(expression: &mut String, index: usize) {
    expression.push('[');
    expression.push_str(&index.to_string());
    expression.push(']');
}

/// Builds a syntax error for the raw path.
fn syntax(raw: &str, reason: &'static str) -> NodePathError {
    NodePathError::Syntax {
        path: raw.to_string(),
        reason,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
