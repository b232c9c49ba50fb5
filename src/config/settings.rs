use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::template::{FallbackScope, UndefinedBehavior};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub template: TemplateSettings,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateSettings {
    /// How unbound variables render: `lenient` (empty string) or `strict`
    #[serde(default)]
    pub undefined: UndefinedBehavior,
    /// Which mapping levels answer a missing key with an empty string
    #[serde(default)]
    pub missing_key_fallback: FallbackScope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("template.undefined", "lenient")?
            .set_default("template.missing_key_fallback", "top_level")?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // MAILROOM__TEMPLATE__UNDEFINED, MAILROOM__LOG__LEVEL, etc.
            .add_source(
                Environment::with_prefix("MAILROOM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
