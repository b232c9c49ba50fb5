//! Template document types and error definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;

/// Variable bindings supplied per render call
pub type Bindings = serde_json::Map<String, serde_json::Value>;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unsupported template node at {path}: expected string, array or object, found {found}")]
    UnsupportedShape {
        path: TemplatePath,
        found: &'static str,
    },

    #[error("Template syntax error at {path} (offset {offset}): {message}")]
    Syntax {
        path: TemplatePath,
        offset: usize,
        message: String,
    },

    #[error("Render failed at {path}: {message}")]
    Render { path: TemplatePath, message: String },

    #[error("Bindings must be an object, found {0}")]
    InvalidBindings(&'static str),

    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template ID: {0}")]
    InvalidId(String),
}

impl TemplateError {
    /// Path of the offending node, for errors raised while walking a document
    pub fn path(&self) -> Option<&TemplatePath> {
        match self {
            TemplateError::UnsupportedShape { path, .. }
            | TemplateError::Syntax { path, .. }
            | TemplateError::Render { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// One step from a parent node to a child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Key/index chain from the document root to a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatePath(SmallVec<[PathSegment; 4]>);

impl TemplatePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for TemplatePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TemplatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathSegment::Key(key) => write!(f, ".{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Raw template document: strings at the leaves, arrays and objects above them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TemplateDocument {
    Scalar(String),
    Sequence(Vec<TemplateDocument>),
    Mapping(BTreeMap<String, TemplateDocument>),
}

impl TemplateDocument {
    /// Convert a JSON value, rejecting numbers, booleans and null
    pub fn from_json(value: serde_json::Value) -> TemplateResult<Self> {
        let mut path = TemplatePath::root();
        Self::from_json_at(value, &mut path)
    }

    fn from_json_at(value: serde_json::Value, path: &mut TemplatePath) -> TemplateResult<Self> {
        match value {
            serde_json::Value::String(s) => Ok(TemplateDocument::Scalar(s)),
            serde_json::Value::Array(items) => {
                let mut sequence = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    sequence.push(Self::from_json_at(item, path)?);
                    path.pop();
                }
                Ok(TemplateDocument::Sequence(sequence))
            }
            serde_json::Value::Object(map) => {
                let mut mapping = BTreeMap::new();
                for (key, item) in map {
                    path.push(PathSegment::Key(key.clone()));
                    let child = Self::from_json_at(item, path)?;
                    path.pop();
                    mapping.insert(key, child);
                }
                Ok(TemplateDocument::Mapping(mapping))
            }
            other => Err(TemplateError::UnsupportedShape {
                path: path.clone(),
                found: json_kind(&other),
            }),
        }
    }
}

impl From<&str> for TemplateDocument {
    fn from(s: &str) -> Self {
        TemplateDocument::Scalar(s.to_string())
    }
}

impl From<String> for TemplateDocument {
    fn from(s: String) -> Self {
        TemplateDocument::Scalar(s)
    }
}

impl TryFrom<serde_json::Value> for TemplateDocument {
    type Error = TemplateError;

    fn try_from(value: serde_json::Value) -> TemplateResult<Self> {
        Self::from_json(value)
    }
}

/// Output of a render: the template's shape with every leaf substituted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RenderedDocument {
    Scalar(String),
    Sequence(Vec<RenderedDocument>),
    Mapping(BTreeMap<String, RenderedDocument>),
}

impl RenderedDocument {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RenderedDocument::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Direct child lookup by key, without any fallback
    pub fn get(&self, key: &str) -> Option<&RenderedDocument> {
        match self {
            RenderedDocument::Mapping(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<RenderedDocument> for serde_json::Value {
    fn from(doc: RenderedDocument) -> Self {
        match doc {
            RenderedDocument::Scalar(s) => serde_json::Value::String(s),
            RenderedDocument::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            RenderedDocument::Mapping(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

/// Borrow a JSON value as a bindings map
pub fn bindings_from_value(value: &serde_json::Value) -> TemplateResult<&Bindings> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(TemplateError::InvalidBindings(json_kind(other))),
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
