//! Dotted field paths across typed objects and embedded JSON documents.
//!
//! A path such as `spec.providerSpec.value.test` starts on a typed object
//! (here a [`Cluster`](crate::Cluster)), resolves `spec`, `providerSpec` and `value`
//! as declared fields, and then drops into the JSON document stored in `value`
//! to resolve `test` as a key of that document.
//!
//! ```
//! use capi_upgrade_core::{Cluster, FieldPath, RawExtension};
//!
//! let mut cluster = Cluster::default();
//! cluster.spec.provider_spec.value = Some(RawExtension::new(r#"{"test": {"cert": "abc"}}"#));
//!
//! let path: FieldPath = "spec.providerSpec.value.test.cert".parse().unwrap();
//! let cert = path.extract_json(&cluster).unwrap();
//! assert_eq!(cert, "abc");
//! ```
use std::{borrow::Cow, fmt, str::FromStr};

use serde_json::Value;
use thiserror::Error;

/// Access to the declared fields of a typed object.
///
/// Implemented by hand for every type that can appear along a field path.
/// Field names are the serialized (camelCase) names of the type.
pub trait Fields: fmt::Debug {
    /// Look up a declared field.
    ///
    /// Returns `None` when `name` is not a field of this type,
    /// and [`FieldValue::Null`] when the field exists but is unset.
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    /// The JSON representation of this object.
    fn to_json(&self) -> Result<Value, serde_json::Error>;
}

/// A node reached while walking a [`FieldPath`].
#[derive(Clone, Debug)]
pub enum FieldValue<'a> {
    /// A declared field that is not set
    Null,
    /// A typed object whose fields are resolved through [`Fields`]
    Object(&'a dyn Fields),
    /// Bytes of an embedded, not yet deserialized, JSON document
    Raw(&'a [u8]),
    /// A decoded JSON value
    Json(Cow<'a, Value>),
}

impl<'a> FieldValue<'a> {
    /// Wrap a typed object.
    pub fn object<T: Fields>(value: &'a T) -> Self {
        FieldValue::Object(value)
    }

    /// Wrap an optional typed object, unset becoming [`FieldValue::Null`].
    pub fn optional<T: Fields>(value: Option<&'a T>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::object)
    }

    /// Wrap an optional string field.
    pub fn string(value: Option<&str>) -> Self {
        value.map_or(FieldValue::Null, |s| FieldValue::json(s))
    }

    /// Wrap anything convertible into a JSON value.
    pub fn json(value: impl Into<Value>) -> Self {
        FieldValue::Json(Cow::Owned(value.into()))
    }

    /// A short description of the node, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Object(_) => "object",
            FieldValue::Raw(_) => "document",
            FieldValue::Json(value) => json_kind(value),
        }
    }

    /// Materialize the node as a JSON value.
    ///
    /// Embedded documents are deserialized and typed objects are serialized.
    pub fn into_json(self) -> Result<Value, serde_json::Error> {
        match self {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Object(object) => object.to_json(),
            FieldValue::Raw(bytes) => serde_json::from_slice(bytes),
            FieldValue::Json(value) => Ok(value.into_owned()),
        }
    }

    fn child(self, segment: &str) -> Result<FieldValue<'a>, Step> {
        match self {
            FieldValue::Object(object) => object.field(segment).ok_or(Step::Unknown),
            FieldValue::Raw(bytes) => {
                let document: Value = serde_json::from_slice(bytes).map_err(Step::Document)?;
                FieldValue::Json(Cow::Owned(document)).child(segment)
            }
            FieldValue::Json(Cow::Borrowed(value)) => match value {
                Value::Object(map) => map
                    .get(segment)
                    .map(|v| FieldValue::Json(Cow::Borrowed(v)))
                    .ok_or(Step::Unknown),
                other => Err(Step::NotTraversable(json_kind(other))),
            },
            FieldValue::Json(Cow::Owned(value)) => match value {
                Value::Object(mut map) => map
                    .remove(segment)
                    .map(|v| FieldValue::Json(Cow::Owned(v)))
                    .ok_or(Step::Unknown),
                other => Err(Step::NotTraversable(json_kind(&other))),
            },
            FieldValue::Null => Err(Step::NotTraversable("null")),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

// Outcome of a single failed step, before path context is attached.
enum Step {
    Unknown,
    NotTraversable(&'static str),
    Document(serde_json::Error),
}

/// Possible errors when parsing or walking a [`FieldPath`]
#[derive(Error, Debug)]
pub enum FieldPathError {
    /// The path string was empty or only whitespace
    #[error("field path is empty")]
    Empty,

    /// A segment between two dots was empty
    #[error("field path {path:?} has an empty segment at position {position}")]
    EmptySegment {
        /// The full path
        path: String,
        /// Index of the empty segment
        position: usize,
    },

    /// No field or key with this name exists on the current node
    #[error("unknown field {segment:?} at position {position} of {path:?}")]
    UnknownField {
        /// The full path
        path: String,
        /// The segment that did not resolve
        segment: String,
        /// Index of the segment
        position: usize,
    },

    /// The current node holds no named fields (unset, scalar or list)
    #[error("cannot resolve {segment:?} at position {position} of {path:?}: parent is {kind}")]
    NotTraversable {
        /// The full path
        path: String,
        /// The segment that did not resolve
        segment: String,
        /// Index of the segment
        position: usize,
        /// What the parent node was
        kind: &'static str,
    },

    /// An embedded document could not be deserialized
    #[error("invalid embedded document before {segment:?} at position {position} of {path:?}: {source}")]
    InvalidDocument {
        /// The full path
        path: String,
        /// The segment that required the document
        segment: String,
        /// Index of the segment
        position: usize,
        /// Deserialization failure
        #[source]
        source: serde_json::Error,
    },
}

/// A parsed, dotted field path.
///
/// Segments are resolved left to right, see the [module documentation](self).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    path: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path, rejecting empty paths and empty segments.
    pub fn parse(path: &str) -> Result<Self, FieldPathError> {
        if path.trim().is_empty() {
            return Err(FieldPathError::Empty);
        }
        let segments = path.split('.').map(str::to_owned).collect::<Vec<_>>();
        if let Some(position) = segments.iter().position(|s| s.trim().is_empty()) {
            return Err(FieldPathError::EmptySegment {
                path: path.to_owned(),
                position,
            });
        }
        Ok(Self {
            path: path.to_owned(),
            segments,
        })
    }

    /// The path as originally written.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The segments of the path, in resolution order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Walk the path from `root` and return the node it ends on.
    pub fn extract<'a>(&self, root: &'a dyn Fields) -> Result<FieldValue<'a>, FieldPathError> {
        let mut current = FieldValue::Object(root);
        for (position, segment) in self.segments.iter().enumerate() {
            current = current
                .child(segment)
                .map_err(|step| self.step_error(step, position))?;
        }
        Ok(current)
    }

    /// Walk the path from `root` and materialize the final node as JSON.
    ///
    /// A path ending on an embedded document returns the deserialized document.
    pub fn extract_json(&self, root: &dyn Fields) -> Result<Value, FieldPathError> {
        self.extract(root)?.into_json().map_err(|source| {
            // segments are never empty once parsed
            let position = self.segments.len().saturating_sub(1);
            self.step_error(Step::Document(source), position)
        })
    }

    fn step_error(&self, step: Step, position: usize) -> FieldPathError {
        let path = self.path.clone();
        let segment = self.segments.get(position).cloned().unwrap_or_default();
        match step {
            Step::Unknown => FieldPathError::UnknownField {
                path,
                segment,
                position,
            },
            Step::NotTraversable(kind) => FieldPathError::NotTraversable {
                path,
                segment,
                position,
                kind,
            },
            Step::Document(source) => FieldPathError::InvalidDocument {
                path,
                segment,
                position,
                source,
            },
        }
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
