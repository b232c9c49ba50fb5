//! Template engine facade bound to configured policies

use crate::config::{Settings, TemplateSettings};

use super::batch::{render_batch, BatchOutcome};
use super::compiler::{compile, CompiledTemplate};
use super::lookup::Lookup;
use super::types::{Bindings, RenderedDocument, TemplateDocument, TemplateResult};

/// Compiles and renders templates using one set of [`TemplateSettings`]
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    settings: TemplateSettings,
}

impl TemplateEngine {
    pub fn new(settings: TemplateSettings) -> Self {
        Self { settings }
    }

    /// Build from `.env`, config files and `MAILROOM__*` variables
    pub fn from_env() -> crate::error::Result<Self> {
        let settings = Settings::new()?;
        tracing::debug!(
            undefined = ?settings.template.undefined,
            missing_key_fallback = ?settings.template.missing_key_fallback,
            "Template engine configured"
        );
        Ok(Self::new(settings.template))
    }

    pub fn settings(&self) -> &TemplateSettings {
        &self.settings
    }

    pub fn compile(&self, doc: TemplateDocument) -> TemplateResult<CompiledTemplate> {
        compile(doc)
    }

    pub fn compile_json(&self, value: serde_json::Value) -> TemplateResult<CompiledTemplate> {
        CompiledTemplate::from_json(value)
    }

    /// Render using the configured undefined-variable behaviour
    pub fn render(
        &self,
        template: &CompiledTemplate,
        bindings: &Bindings,
    ) -> TemplateResult<RenderedDocument> {
        template.render_with(bindings, self.settings.undefined)
    }

    pub fn render_batch(
        &self,
        template: &CompiledTemplate,
        records: &[serde_json::Value],
    ) -> BatchOutcome {
        render_batch(template, records, self.settings.undefined)
    }

    /// Lookup view using the configured missing-key fallback
    pub fn lookup<'a>(&self, doc: &'a RenderedDocument) -> Lookup<'a> {
        doc.lookup(self.settings.missing_key_fallback)
    }
}
