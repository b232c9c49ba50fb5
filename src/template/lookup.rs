//! Key lookup over rendered documents with an empty-string fallback

use serde::Deserialize;

use super::types::RenderedDocument;

/// Which mapping levels substitute `""` for a missing key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackScope {
    /// Only keys of the root mapping
    #[default]
    TopLevel,
    /// Keys of every mapping, at any depth
    AllDepths,
    /// Missing keys are reported as absent
    Disabled,
}

impl FallbackScope {
    fn applies_at(self, depth: usize) -> bool {
        match self {
            FallbackScope::TopLevel => depth == 0,
            FallbackScope::AllDepths => true,
            FallbackScope::Disabled => false,
        }
    }
}

/// Read-only view of a rendered document that answers missing keys with `""`
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    node: Option<&'a RenderedDocument>,
    scope: FallbackScope,
    depth: usize,
}

impl<'a> Lookup<'a> {
    pub fn new(doc: &'a RenderedDocument, scope: FallbackScope) -> Self {
        Self {
            node: Some(doc),
            scope,
            depth: 0,
        }
    }

    /// Descend into a mapping key.
    ///
    /// Returns `None` when the key is absent and the fallback does not cover
    /// this depth; otherwise a view that reads as `""` when absent.
    pub fn get(&self, key: &str) -> Option<Lookup<'a>> {
        let child = self.node.and_then(|node| node.get(key));
        if child.is_none() && !self.scope.applies_at(self.depth) {
            return None;
        }
        Some(Lookup {
            node: child,
            scope: self.scope,
            depth: self.depth + 1,
        })
    }

    /// Text of a scalar leaf, `""` for a defaulted key, `None` for containers
    pub fn as_str(&self) -> Option<&'a str> {
        match self.node {
            Some(node) => node.as_str(),
            None => Some(""),
        }
    }

    /// Shorthand for `get(key)` followed by `as_str()`
    pub fn text(&self, key: &str) -> Option<&'a str> {
        self.get(key)?.as_str()
    }

    /// The underlying node, or `None` if this view is a defaulted key
    pub fn node(&self) -> Option<&'a RenderedDocument> {
        self.node
    }

    pub fn is_defaulted(&self) -> bool {
        self.node.is_none()
    }
}

impl RenderedDocument {
    /// Lookup view honouring the given fallback scope
    pub fn lookup(&self, scope: FallbackScope) -> Lookup<'_> {
        Lookup::new(self, scope)
    }

    /// Text of a top-level key; missing keys and non-string values read as `""`.
    ///
    /// This always applies the fallback, whatever [`FallbackScope`] is
    /// configured. Use [`RenderedDocument::lookup`] to honour the scope.
    pub fn field(&self, key: &str) -> &str {
        self.get(key).and_then(RenderedDocument::as_str).unwrap_or("")
    }
}
