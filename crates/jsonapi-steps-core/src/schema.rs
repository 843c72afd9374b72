// crates/jsonapi-steps-core/src/schema.rs
// ============================================================================
// Module: JSON API Schema
// Description: Schema loading, bounded reference resolution, and validation.
// Purpose: Validate response documents against a configured JSON Schema.
// Dependencies: jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`SchemaDocument`] is read once from disk when the assertion helper is
//! built; a missing or unreadable file is a [`ConfigurationError`]. Before
//! validation, referenced files are bundled into the root document so the
//! validator sees a single self-contained schema.
//!
//! Resolution rules:
//! - `#/pointer` refers into the document containing the reference; inside
//!   the root document it is checked and kept as written;
//! - `file.json` and `file.json#/pointer` refer to sibling files, relative to
//!   the directory of the referring document; `file://` URIs are absolute;
//! - each file is stored once under the root `definitions` table (or `$defs`
//!   when only that exists) and references to it become local pointers, so
//!   recursive references stay references and the resolved size is linear;
//! - references carrying any other URI scheme are left for the validator;
//! - a chain of file references longer than the cap (default
//!   [`DEFAULT_MAX_REF_DEPTH`]) fails with
//!   [`SchemaError::ReferenceDepthExceeded`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use jsonschema::Validator;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum chain of file references.
pub const DEFAULT_MAX_REF_DEPTH: usize = 15;
/// Maximum schema file size in bytes.
pub const MAX_SCHEMA_FILE_BYTES: usize = 1024 * 1024;
/// Keywords holding reusable subschemas, in bundling preference order.
const DEFINITION_KEYWORDS: [&str; 2] = ["definitions", "$defs"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Construction-time configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The schema file does not exist.
    #[error("the JSON API schema doesn't exist: {0}")]
    MissingSchema(String),
    /// The schema file could not be read.
    #[error("unable to read JSON API schema {path}: {message}")]
    Io {
        /// Schema path.
        path: String,
        /// Underlying I/O message.
        message: String,
    },
    /// The schema file exceeds [`MAX_SCHEMA_FILE_BYTES`].
    #[error("JSON API schema {path} exceeds size limit ({actual_bytes} > {max_bytes} bytes)")]
    TooLarge {
        /// Schema path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual file size.
        actual_bytes: usize,
    },
    /// The schema file is not a JSON document.
    #[error("JSON API schema {path} is not valid json: {message}")]
    InvalidSchema {
        /// Schema path.
        path: String,
        /// Parse error message.
        message: String,
    },
    /// The reference depth cap is zero.
    #[error("schema reference depth must be greater than zero")]
    InvalidRefDepth,
}

/// Reference resolution and compilation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A `$ref` target could not be located.
    #[error("unresolved schema reference `{0}`")]
    UnresolvedReference(String),
    /// A referenced schema file could not be loaded.
    #[error("unable to load referenced schema `{reference}`: {message}")]
    ReferenceLoad {
        /// Reference text.
        reference: String,
        /// Load failure message.
        message: String,
    },
    /// A chain of file references is longer than the configured cap.
    #[error("schema reference `{reference}` exceeds max resolution depth {max_depth}")]
    ReferenceDepthExceeded {
        /// Reference text.
        reference: String,
        /// Configured cap.
        max_depth: usize,
    },
    /// The resolved schema failed to compile.
    #[error("schema compilation failed: {0}")]
    Compile(String),
}

/// Schema violations for a validated document.
///
/// # Invariants
/// - `violations` is never empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("the JSON is not valid according to the schema:\n- {}", .violations.join("\n- "))]
pub struct SchemaValidationError {
    /// Every violation reported by the validator, in report order.
    pub violations: Vec<String>,
}

// ============================================================================
// SECTION: Schema Document
// ============================================================================

/// JSON Schema document loaded from disk.
///
/// # Invariants
/// - `document` never changes after load.
/// - `max_ref_depth` is greater than zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// Source file path.
    path: PathBuf,
    /// Directory used to resolve relative file references.
    base_dir: PathBuf,
    /// Parsed schema document.
    document: Value,
    /// Maximum chain of file references.
    max_ref_depth: usize,
}

impl SchemaDocument {
    /// Loads a schema file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the file is absent, unreadable,
    /// oversized, or not JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if !path.is_file() {
            return Err(ConfigurationError::MissingSchema(display));
        }
        let bytes = fs::read(path).map_err(|err| ConfigurationError::Io {
            path: display.clone(),
            message: err.to_string(),
        })?;
        if bytes.len() > MAX_SCHEMA_FILE_BYTES {
            return Err(ConfigurationError::TooLarge {
                path: display,
                max_bytes: MAX_SCHEMA_FILE_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        let document: Value =
            serde_json::from_slice(&bytes).map_err(|err| ConfigurationError::InvalidSchema {
                path: display,
                message: err.to_string(),
            })?;
        let base_dir = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
        Ok(Self {
            path: path.to_path_buf(),
            base_dir,
            document,
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
        })
    }

    /// Overrides the reference resolution depth cap.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRefDepth`] when `depth` is zero.
    pub fn with_max_ref_depth(mut self, depth: usize) -> Result<Self, ConfigurationError> {
        if depth == 0 {
            return Err(ConfigurationError::InvalidRefDepth);
        }
        self.max_ref_depth = depth;
        Ok(self)
    }

    /// Returns the schema file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the parsed document as loaded.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// Returns the reference resolution depth cap.
    #[must_use]
    pub const fn max_ref_depth(&self) -> usize {
        self.max_ref_depth
    }

    /// Bundles referenced files into the root document.
    ///
    /// Each file is loaded once and stored under the root definition table;
    /// its references are rewritten to local pointers. References into the
    /// root document are left for the validator, which resolves them lazily.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a reference cannot be resolved or the
    /// chain of file references is deeper than the cap.
    pub fn resolve(&self) -> Result<Value, SchemaError> {
        let mut bundler = RefBundler::new(&self.document, &self.base_dir, self.max_ref_depth);
        let mut resolved = self.document.clone();
        let scope = Scope {
            document: DocumentId::Root,
            depth: 0,
        };
        bundler.rewrite(&mut resolved, &scope)?;
        bundler.finish(&mut resolved)?;
        Ok(resolved)
    }

    /// Resolves references and compiles a validator.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when resolution or compilation fails.
    pub fn compile(&self) -> Result<CompiledSchema, SchemaError> {
        let resolved = self.resolve()?;
        let validator = jsonschema::options()
            .build(&resolved)
            .map_err(|err| SchemaError::Compile(err.to_string()))?;
        Ok(CompiledSchema {
            validator,
        })
    }
}

// ============================================================================
// SECTION: Compiled Schema
// ============================================================================

/// Compiled validator for a resolved schema.
pub struct CompiledSchema {
    /// Compiled `jsonschema` validator.
    validator: Validator,
}

impl CompiledSchema {
    /// Validates an instance, collecting every violation.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaValidationError`] when the instance is invalid.
    pub fn validate(&self, instance: &Value) -> Result<(), SchemaValidationError> {
        if self.validator.is_valid(instance) {
            return Ok(());
        }
        let violations: Vec<String> =
            self.validator.iter_errors(instance).map(|err| err.to_string()).collect();
        if violations.is_empty() {
            return Err(SchemaValidationError {
                violations: vec!["schema validation failed".to_string()],
            });
        }
        Err(SchemaValidationError {
            violations,
        })
    }
}

// ============================================================================
// SECTION: Reference Resolution
// ============================================================================

/// Document a schema node belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DocumentId {
    /// The loaded schema file.
    Root,
    /// A referenced file, by canonical path.
    File(PathBuf),
}

/// Parsed `$ref` target.
struct RefTarget<'a> {
    /// File part, when the reference leaves the current document.
    file: Option<&'a str>,
    /// JSON pointer part (empty for the whole document).
    pointer: &'a str,
}

/// Document being rewritten and its distance from the root in file hops.
struct Scope {
    /// Document the rewritten nodes came from.
    document: DocumentId,
    /// Number of file references followed to reach `document`.
    depth: usize,
}

/// Bundles referenced files into the root definition table.
struct RefBundler<'a> {
    /// Root schema document as loaded.
    root: &'a Value,
    /// Directory of the root schema file.
    base_dir: &'a Path,
    /// Maximum chain of file references.
    max_depth: usize,
    /// Root keyword that receives bundled files.
    table: &'static str,
    /// Keys already present in the root definition table.
    reserved: BTreeSet<String>,
    /// Bundle key per canonical file path.
    keys: BTreeMap<PathBuf, String>,
    /// Files as loaded, for pointer checks.
    originals: BTreeMap<PathBuf, Value>,
    /// Rewritten files in load order.
    bundled: Vec<(String, Value)>,
}

impl<'a> RefBundler<'a> {
    /// Creates a bundler for `root`.
    fn new(root: &'a Value, base_dir: &'a Path, max_depth: usize) -> Self {
        let existing = |key: &str| root.get(key).and_then(Value::as_object);
        let table = DEFINITION_KEYWORDS
            .into_iter()
            .find(|key| existing(*key).is_some())
            .unwrap_or(DEFINITION_KEYWORDS[0]);
        let reserved = existing(table).map(|map| map.keys().cloned().collect()).unwrap_or_default();
        Self {
            root,
            base_dir,
            max_depth,
            table,
            reserved,
            keys: BTreeMap::new(),
            originals: BTreeMap::new(),
            bundled: Vec::new(),
        }
    }

    /// Rewrites every `$ref` below `node`.
    fn rewrite(&mut self, node: &mut Value, scope: &Scope) -> Result<(), SchemaError> {
        match node {
            Value::Object(map) => {
                let reference = map.get("$ref").and_then(Value::as_str).map(str::to_string);
                if let Some(reference) = reference
                    && let Some(rewritten) = self.rewrite_reference(&reference, scope)?
                {
                    map.insert("$ref".to_string(), Value::String(rewritten));
                }
                for (key, value) in map.iter_mut() {
                    if key != "$ref" {
                        self.rewrite(value, scope)?;
                    }
                }
                Ok(())
            }
            Value::Array(items) => {
                for item in items {
                    self.rewrite(item, scope)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns the local form of `reference`, or `None` to keep it as written.
    fn rewrite_reference(
        &mut self,
        reference: &str,
        scope: &Scope,
    ) -> Result<Option<String>, SchemaError> {
        let Some(target) = parse_reference(reference) else {
            return Ok(None);
        };
        let document = match target.file {
            Some(file) => {
                let path = self.file_path(&scope.document, file, reference)?;
                self.bundle_file(&path, reference, scope.depth)?;
                DocumentId::File(path)
            }
            None => scope.document.clone(),
        };
        self.check_pointer(&document, target.pointer, reference)?;
        match document {
            DocumentId::Root => Ok(None),
            DocumentId::File(path) => {
                let prefix = self.bundle_pointer(&path, reference)?;
                Ok(Some(format!("#{prefix}{}", target.pointer)))
            }
        }
    }

    /// Loads and rewrites a referenced file once.
    fn bundle_file(
        &mut self,
        path: &Path,
        reference: &str,
        depth: usize,
    ) -> Result<(), SchemaError> {
        if self.keys.contains_key(path) {
            return Ok(());
        }
        if depth >= self.max_depth {
            return Err(SchemaError::ReferenceDepthExceeded {
                reference: reference.to_string(),
                max_depth: self.max_depth,
            });
        }
        let original = load_external(path, reference)?;
        let key = self.bundle_key(path);
        self.keys.insert(path.to_path_buf(), key.clone());
        self.originals.insert(path.to_path_buf(), original.clone());

        let mut rewritten = original;
        if let Value::Object(map) = &mut rewritten {
            map.remove("$id");
            map.remove("$schema");
            if map.get("id").is_some_and(Value::is_string) {
                map.remove("id");
            }
        }
        let scope = Scope {
            document: DocumentId::File(path.to_path_buf()),
            depth: depth + 1,
        };
        self.rewrite(&mut rewritten, &scope)?;
        self.bundled.push((key, rewritten));
        Ok(())
    }

    /// Picks an unused definition key derived from the file name.
    fn bundle_key(&self, path: &Path) -> String {
        let name: String = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default()
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') { ch } else { '_' }
            })
            .collect();
        let taken = |key: &str| {
            self.reserved.contains(key) || self.keys.values().any(|existing| existing == key)
        };
        if !name.is_empty() && !taken(&name) {
            return name;
        }
        (2..)
            .map(|suffix| format!("{name}-{suffix}"))
            .find(|key| !taken(key))
            .unwrap_or_else(|| name.clone())
    }

    /// Returns the root pointer of a bundled file.
    fn bundle_pointer(&self, path: &Path, reference: &str) -> Result<String, SchemaError> {
        let key = self
            .keys
            .get(path)
            .ok_or_else(|| SchemaError::UnresolvedReference(reference.to_string()))?;
        Ok(format!("/{}/{key}", self.table))
    }

    /// Fails unless `pointer` names a node of `document`.
    fn check_pointer(
        &self,
        document: &DocumentId,
        pointer: &str,
        reference: &str,
    ) -> Result<(), SchemaError> {
        let source = match document {
            DocumentId::Root => Some(self.root),
            DocumentId::File(path) => self.originals.get(path),
        };
        match source.and_then(|source| source.pointer(pointer)) {
            Some(_) => Ok(()),
            None => Err(SchemaError::UnresolvedReference(reference.to_string())),
        }
    }

    /// Resolves a referenced file path relative to the referring document.
    fn file_path(
        &self,
        document: &DocumentId,
        file: &str,
        reference: &str,
    ) -> Result<PathBuf, SchemaError> {
        let path = if let Some(absolute) = file.strip_prefix("file://") {
            PathBuf::from(absolute)
        } else {
            let dir = match document {
                DocumentId::Root => self.base_dir,
                DocumentId::File(path) => path.parent().unwrap_or(self.base_dir),
            };
            dir.join(file)
        };
        fs::canonicalize(&path).map_err(|err| SchemaError::ReferenceLoad {
            reference: reference.to_string(),
            message: err.to_string(),
        })
    }

    /// Moves bundled files into the definition table of `resolved`.
    fn finish(self, resolved: &mut Value) -> Result<(), SchemaError> {
        if self.bundled.is_empty() {
            return Ok(());
        }
        let Value::Object(root) = resolved else {
            return Err(SchemaError::Compile("schema root must be an object".to_string()));
        };
        let table =
            root.entry(self.table.to_string()).or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(table) = table else {
            return Err(SchemaError::Compile(format!("`{}` must be an object", self.table)));
        };
        table.extend(self.bundled);
        Ok(())
    }
}

/// Splits a `$ref` into file and pointer parts; `None` for foreign URIs.
fn parse_reference(reference: &str) -> Option<RefTarget<'_>> {
    let (file, fragment) = match reference.split_once('#') {
        Some((file, fragment)) => (file, fragment),
        None => (reference, ""),
    };
    if !file.starts_with("file://") && file.contains("://") {
        return None;
    }
    Some(RefTarget {
        file: if file.is_empty() { None } else { Some(file) },
        pointer: fragment,
    })
}

/// Loads a referenced schema file.
fn load_external(path: &Path, reference: &str) -> Result<Value, SchemaError> {
    let load_error = |message: String| SchemaError::ReferenceLoad {
        reference: reference.to_string(),
        message,
    };
    let bytes = fs::read(path).map_err(|err| load_error(err.to_string()))?;
    if bytes.len() > MAX_SCHEMA_FILE_BYTES {
        return Err(load_error("referenced schema exceeds size limit".to_string()));
    }
    serde_json::from_slice(&bytes).map_err(|err| load_error(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
