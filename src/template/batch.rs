//! Rendering one compiled template against many binding records

use super::compiler::CompiledTemplate;
use super::expression::UndefinedBehavior;
use super::types::{bindings_from_value, RenderedDocument, TemplateError};

/// A record that could not be rendered
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the record in the input slice
    pub index: usize,
    pub error: TemplateError,
}

/// Per-record results of a batch render
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully rendered documents with their record index
    pub rendered: Vec<(usize, RenderedDocument)>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render `template` once per record.
///
/// A record that is not a JSON object, or that fails under strict rendering,
/// is logged and recorded as a failure; the remaining records still render.
pub fn render_batch(
    template: &CompiledTemplate,
    records: &[serde_json::Value],
    undefined: UndefinedBehavior,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for (index, record) in records.iter().enumerate() {
        let result = bindings_from_value(record)
            .and_then(|bindings| template.render_with(bindings, undefined));

        match result {
            Ok(doc) => outcome.rendered.push((index, doc)),
            Err(error) => {
                tracing::warn!(index, error = %error, "Failed to render record");
                outcome.failures.push(BatchFailure { index, error });
            }
        }
    }

    tracing::debug!(
        rendered = outcome.rendered_count(),
        failed = outcome.failed_count(),
        "Batch render finished"
    );

    outcome
}
