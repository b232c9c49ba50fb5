//! Compiled template storage with CRUD operations

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use super::compiler::CompiledTemplate;
use super::expression::UndefinedBehavior;
use super::types::{bindings_from_value, RenderedDocument, TemplateError, TemplateResult};

/// A named template, kept alongside its compiled form
#[derive(Debug, Clone, Serialize)]
pub struct StoredTemplate {
    /// Unique template identifier (alphanumeric, dash, underscore)
    pub id: String,

    /// JSON template source as supplied by the caller
    pub source: serde_json::Value,

    /// Compiled tree, shared with in-flight renders
    #[serde(skip)]
    pub compiled: Arc<CompiledTemplate>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Validate a template ID
pub fn validate_id(id: &str) -> TemplateResult<()> {
    if id.is_empty() || id.len() > 64 {
        return Err(TemplateError::InvalidId(
            "ID must be 1-64 characters".to_string(),
        ));
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(TemplateError::InvalidId(
            "ID must contain only alphanumeric, dash, or underscore".to_string(),
        ));
    }

    Ok(())
}

/// In-memory store of compiled templates
pub struct TemplateStore {
    templates: DashMap<String, StoredTemplate>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    /// Create a new template store
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Compile and store a new template
    pub fn create(&self, id: &str, source: serde_json::Value) -> TemplateResult<StoredTemplate> {
        validate_id(id)?;

        if self.templates.contains_key(id) {
            return Err(TemplateError::AlreadyExists(id.to_string()));
        }

        let compiled = Arc::new(CompiledTemplate::from_json(source.clone())?);
        let now = Utc::now();
        let stored = StoredTemplate {
            id: id.to_string(),
            source,
            compiled,
            created_at: now,
            updated_at: now,
        };

        // Re-check under the entry lock; another caller may have won the race
        match self.templates.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(TemplateError::AlreadyExists(id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(stored.clone());
                tracing::info!(template_id = %id, "Template created");
                Ok(stored)
            }
        }
    }

    /// Get a template by ID
    pub fn get(&self, id: &str) -> TemplateResult<StoredTemplate> {
        self.templates
            .get(id)
            .map(|t| t.clone())
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// Get only the compiled tree, for rendering outside the store
    pub fn compiled(&self, id: &str) -> TemplateResult<Arc<CompiledTemplate>> {
        self.templates
            .get(id)
            .map(|t| Arc::clone(&t.compiled))
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// List all templates
    pub fn list(&self) -> Vec<StoredTemplate> {
        self.templates
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Replace a template's source, recompiling it.
    ///
    /// On a compile error the previous version stays in place.
    /// A concurrently deleted ID stays deleted.
    pub fn update(&self, id: &str, source: serde_json::Value) -> TemplateResult<StoredTemplate> {
        if !self.templates.contains_key(id) {
            return Err(TemplateError::NotFound(id.to_string()));
        }

        let compiled = Arc::new(CompiledTemplate::from_json(source.clone())?);

        // Mutate in place under the shard lock so a delete is never undone
        let mut template = self
            .templates
            .get_mut(id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        template.compiled = compiled;
        template.source = source;
        template.updated_at = Utc::now();
        let updated = template.clone();
        drop(template);

        tracing::info!(template_id = %id, "Template updated");
        Ok(updated)
    }

    /// Delete a template by ID
    pub fn delete(&self, id: &str) -> TemplateResult<()> {
        self.templates
            .remove(id)
            .map(|_| tracing::info!(template_id = %id, "Template deleted"))
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// Check if a template exists
    pub fn exists(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Get the number of templates
    pub fn count(&self) -> usize {
        self.templates.len()
    }

    /// Render a stored template with variables
    pub fn render(
        &self,
        id: &str,
        variables: &serde_json::Value,
        undefined: UndefinedBehavior,
    ) -> TemplateResult<RenderedDocument> {
        let compiled = self.compiled(id)?;
        let bindings = bindings_from_value(variables)?;
        compiled.render_with(bindings, undefined)
    }
}

/// Create an Arc-wrapped template store
pub fn create_template_store() -> Arc<TemplateStore> {
    Arc::new(TemplateStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_create_and_get() {
        let store = TemplateStore::new();

        let created = store
            .create("welcome", json!({"subject": "Hi {{name}}"}))
            .unwrap();
        assert_eq!(created.id, "welcome");

        let retrieved = store.get("welcome").unwrap();
        assert_eq!(retrieved.source, json!({"subject": "Hi {{name}}"}));
        assert_eq!(retrieved.compiled.leaf_count(), 1);
    }

    #[test]
    fn test_store_create_duplicate() {
        let store = TemplateStore::new();

        store.create("duplicate", json!("x")).unwrap();
        assert!(matches!(
            store.create("duplicate", json!("y")),
            Err(TemplateError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_store_create_invalid_id() {
        let store = TemplateStore::new();
        assert!(matches!(
            store.create("bad id!", json!("x")),
            Err(TemplateError::InvalidId(_))
        ));
        assert!(matches!(
            store.create("", json!("x")),
            Err(TemplateError::InvalidId(_))
        ));
        assert!(!store.exists("bad id!"));
    }

    #[test]
    fn test_store_create_rejects_bad_template() {
        let store = TemplateStore::new();
        assert!(matches!(
            store.create("broken", json!({"text": "{{oops"})),
            Err(TemplateError::Syntax { .. })
        ));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_store_update() {
        let store = TemplateStore::new();
        let original = store.create("update-test", json!("v1 {{a}}")).unwrap();

        let updated = store.update("update-test", json!("v2 {{a}}")).unwrap();
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at >= original.updated_at);

        let rendered = store
            .render("update-test", &json!({"a": "!"}), UndefinedBehavior::Lenient)
            .unwrap();
        assert_eq!(rendered.as_str(), Some("v2 !"));
    }

    #[test]
    fn test_store_update_after_delete() {
        let store = TemplateStore::new();
        store.create("gone", json!("v1")).unwrap();
        store.delete("gone").unwrap();

        assert!(matches!(
            store.update("gone", json!("v2")),
            Err(TemplateError::NotFound(_))
        ));
        assert!(!store.exists("gone"));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_store_concurrent_update_and_delete() {
        let store = create_template_store();
        for round in 0..50 {
            let id = format!("race-{}", round);
            store.create(&id, json!("v1")).unwrap();

            let updater = {
                let store = Arc::clone(&store);
                let id = id.clone();
                std::thread::spawn(move || {
                    let _ = store.update(&id, json!("v2 {{a}}"));
                })
            };
            store.delete(&id).unwrap();
            updater.join().unwrap();

            assert!(!store.exists(&id));
        }
    }

    #[test]
    fn test_stored_template_serializes_without_compiled_tree() {
        let store = TemplateStore::new();
        let stored = store.create("welcome", json!({"subject": "Hi {{name}}"})).unwrap();

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], "welcome");
        assert_eq!(value["source"], json!({"subject": "Hi {{name}}"}));
        assert!(value.get("compiled").is_none());
        assert!(value["created_at"].is_string());
    }

    #[test]
    fn test_store_update_keeps_old_on_error() {
        let store = TemplateStore::new();
        store.create("keep", json!("v1")).unwrap();

        assert!(store.update("keep", json!(7)).is_err());
        assert_eq!(store.get("keep").unwrap().source, json!("v1"));
    }

    #[test]
    fn test_store_delete() {
        let store = TemplateStore::new();
        store.create("delete-test", json!("x")).unwrap();
        assert!(store.exists("delete-test"));

        store.delete("delete-test").unwrap();
        assert!(!store.exists("delete-test"));
        assert!(matches!(
            store.delete("delete-test"),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn test_store_list() {
        let store = TemplateStore::new();
        for i in 0..3 {
            store
                .create(&format!("template-{}", i), json!(["{{x}}"]))
                .unwrap();
        }
        assert_eq!(store.list().len(), 3);
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn test_render_template() {
        let store = TemplateStore::new();
        store
            .create(
                "order-shipped",
                json!({
                    "subject": "Order {{order_id}} shipped",
                    "text": "Tracking: {{tracking_number}}"
                }),
            )
            .unwrap();

        let rendered = store
            .render(
                "order-shipped",
                &json!({"order_id": "ORD-456", "tracking_number": "TW123456789"}),
                UndefinedBehavior::Lenient,
            )
            .unwrap();
        assert_eq!(rendered.field("subject"), "Order ORD-456 shipped");
        assert_eq!(rendered.field("text"), "Tracking: TW123456789");
    }

    #[test]
    fn test_render_rejects_non_object_variables() {
        let store = TemplateStore::new();
        store.create("t", json!("{{a}}")).unwrap();
        assert!(matches!(
            store.render("t", &json!([1]), UndefinedBehavior::Lenient),
            Err(TemplateError::InvalidBindings("array"))
        ));
        assert!(matches!(
            store.render("missing", &json!({}), UndefinedBehavior::Lenient),
            Err(TemplateError::NotFound(_))
        ));
    }
}
