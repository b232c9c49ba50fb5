//! Placeholder parsing and substitution for a single leaf string
//!
//! Placeholders are `{{ name }}` or dotted paths such as `{{ user.name }}` and
//! `{{ items.0 }}`. Single braces are plain text, but any `}}` outside a
//! placeholder is rejected as unbalanced. That includes nested CSS rules in an
//! HTML part, e.g. `@media x { a { color: red }}`; separate the closing braces
//! (`} }`) in such templates.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use super::types::Bindings;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Malformed placeholder syntax inside one leaf string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (offset {offset})")]
pub struct SyntaxError {
    /// Byte offset of the offending delimiter within the leaf
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A variable was referenced but not bound, under strict rendering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("undefined variable `{0}`")]
pub struct UndefinedVariable(pub String);

/// What to do with a placeholder whose variable is not bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedBehavior {
    /// Render as the empty string
    #[default]
    Lenient,
    /// Fail the render with the offending path
    Strict,
}

/// Dotted variable reference, e.g. `user.name` or `items.0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePath(Vec<String>);

impl VariablePath {
    fn parse(body: &str) -> Result<Self, String> {
        let body = body.trim();
        if body.is_empty() {
            return Err("empty placeholder".to_string());
        }

        let mut parts = Vec::new();
        for (i, part) in body.split('.').enumerate() {
            let valid = if i == 0 {
                is_identifier(part)
            } else {
                is_identifier(part) || is_index(part)
            };
            if !valid {
                return Err(format!("invalid placeholder expression `{}`", body));
            }
            parts.push(part.to_string());
        }

        Ok(Self(parts))
    }

    /// Name of the top-level binding this path starts from
    pub fn root(&self) -> &str {
        &self.0[0]
    }

    fn resolve<'a>(&self, bindings: &'a Bindings) -> Option<&'a serde_json::Value> {
        let (first, rest) = self.0.split_first()?;
        let mut value = bindings.get(first)?;
        for part in rest {
            value = match value {
                serde_json::Value::Object(map) => map.get(part)?,
                serde_json::Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_index(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(VariablePath),
}

/// Parsed leaf template: literal text interleaved with `{{ variable }}` lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    segments: Vec<Segment>,
    literal_len: usize,
}

impl Expression {
    /// Parse a leaf string
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        let mut segments = Vec::new();
        let mut literal_len = 0;
        let mut cursor = 0;

        while cursor < source.len() {
            let rest = &source[cursor..];
            let close = rest.find(CLOSE);
            // An opening delimiter only counts if it precedes the first close
            let open = rest
                .find(OPEN)
                .filter(|&o| close.map_or(true, |c| o < c));

            match (open, close) {
                (Some(o), _) => {
                    if o > 0 {
                        literal_len += o;
                        segments.push(Segment::Literal(rest[..o].to_string()));
                    }

                    let start = cursor + o;
                    let body_start = start + OPEN.len();
                    let Some(body_len) = source[body_start..].find(CLOSE) else {
                        return Err(SyntaxError::new(start, "unterminated placeholder"));
                    };
                    let body = &source[body_start..body_start + body_len];
                    if let Some(nested) = body.find(OPEN) {
                        return Err(SyntaxError::new(
                            body_start + nested,
                            "unexpected `{{` inside placeholder",
                        ));
                    }

                    let path =
                        VariablePath::parse(body).map_err(|msg| SyntaxError::new(start, msg))?;
                    segments.push(Segment::Variable(path));
                    cursor = body_start + body_len + CLOSE.len();
                }
                (_, Some(c)) => {
                    return Err(SyntaxError::new(
                        cursor + c,
                        "unbalanced `}}` without matching `{{`",
                    ));
                }
                (None, None) => {
                    literal_len += rest.len();
                    segments.push(Segment::Literal(rest.to_string()));
                    break;
                }
            }
        }

        Ok(Self {
            segments,
            literal_len,
        })
    }

    /// Whether the leaf has no placeholders at all
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Variables referenced by this leaf, in order of appearance
    pub fn variables(&self) -> impl Iterator<Item = &VariablePath> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(path) => Some(path),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute bindings; unbound variables render as the empty string
    pub fn render(&self, bindings: &Bindings) -> String {
        let mut out = String::with_capacity(self.literal_len * 2);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(path) => {
                    if let Some(value) = path.resolve(bindings) {
                        push_value(&mut out, value);
                    }
                }
            }
        }
        out
    }

    /// Substitute bindings, failing on the first unbound variable
    pub fn render_strict(&self, bindings: &Bindings) -> Result<String, UndefinedVariable> {
        let mut out = String::with_capacity(self.literal_len * 2);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(path) => match path.resolve(bindings) {
                    Some(value) => push_value(&mut out, value),
                    None => return Err(UndefinedVariable(path.to_string())),
                },
            }
        }
        Ok(out)
    }
}

fn push_value(out: &mut String, value: &serde_json::Value) {
    match value {
        serde_json::Value::String(s) => out.push_str(s),
        serde_json::Value::Null => {}
        serde_json::Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        // Numbers, arrays and objects use their JSON representation
        other => out.push_str(&other.to_string()),
    }
}
