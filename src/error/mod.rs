use thiserror::Error;

use crate::telemetry::TelemetryError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl Error {
    /// Stable machine-readable code for the error category
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Template(TemplateError::UnsupportedShape { .. }) => "UNSUPPORTED_SHAPE",
            Error::Template(TemplateError::Syntax { .. }) => "TEMPLATE_SYNTAX",
            Error::Template(TemplateError::Render { .. }) => "RENDER_ERROR",
            Error::Template(TemplateError::InvalidBindings(_)) => "INVALID_BINDINGS",
            Error::Template(TemplateError::NotFound(_)) => "NOT_FOUND",
            Error::Template(TemplateError::AlreadyExists(_)) => "ALREADY_EXISTS",
            Error::Template(TemplateError::InvalidId(_)) => "INVALID_ID",
            Error::Telemetry(_) => "TELEMETRY_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
