//! Document template system.
//!
//! This module provides:
//! - Template documents: strings, arrays and objects with `{{variable}}` leaves
//! - A compiler that validates the tree once and parses every leaf
//! - A renderer that substitutes bindings while preserving the tree's shape
//! - Batch rendering and an in-memory store of compiled templates
//!
//! # Example
//!
//! ```ignore
//! let template = CompiledTemplate::from_json(json!({
//!     "subject": "Your order has shipped",
//!     "text": "Order {{order_id}} is on its way via {{carrier}}",
//!     "tags": ["{{carrier}}", "shipping"]
//! }))?;
//!
//! let variables = json!({
//!     "order_id": "ORD-123",
//!     "carrier": "FedEx"
//! });
//!
//! let rendered = template.render(bindings_from_value(&variables)?);
//! assert_eq!(rendered.field("text"), "Order ORD-123 is on its way via FedEx");
//! assert_eq!(rendered.field("html"), "");
//! ```

mod batch;
mod compiler;
mod engine;
mod expression;
mod lookup;
mod store;
mod types;

pub use batch::{render_batch, BatchFailure, BatchOutcome};
pub use compiler::{compile, CompiledTemplate};
pub use engine::TemplateEngine;
pub use expression::{Expression, SyntaxError, UndefinedBehavior, UndefinedVariable, VariablePath};
pub use lookup::{FallbackScope, Lookup};
pub use store::{create_template_store, validate_id, StoredTemplate, TemplateStore};
pub use types::{
    bindings_from_value, Bindings, PathSegment, RenderedDocument, TemplateDocument,
    TemplateError, TemplatePath, TemplateResult,
};
