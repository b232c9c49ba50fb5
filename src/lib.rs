// Supporting modules
pub mod config;
pub mod error;
pub mod telemetry;

// Domain layer
pub mod template;

pub use error::{Error, Result};
