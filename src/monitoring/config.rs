// src/monitoring/config.rs
// Where helpbot logs go: a console stream and/or daily JSON files

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_FILTER: &str = "info,helpbot=info,actix_web=info";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_FILE_PREFIX: &str = "helpbot.log";

/// Console output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

/// Logging settings.
///
/// `None` for `console` or `log_dir` turns that sink off. File output is
/// always JSON so ingestion and query logs can be grepped by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub console: Option<LogFormat>,
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            console: Some(LogFormat::Text),
            log_dir: Some(PathBuf::from(DEFAULT_LOG_DIR)),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT` (`text`, `json` or `off`), `LOG_DIR` and
    /// `LOG_TO_FILE` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(filter) = lookup("RUST_LOG").filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.console = match format.trim().to_lowercase().as_str() {
                "text" => Some(LogFormat::Text),
                "json" => Some(LogFormat::Json),
                "off" | "none" => None,
                _ => return Err(invalid("LOG_FORMAT", format)),
            };
        }

        if let Some(dir) = lookup("LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }

        if let Some(to_file) = lookup("LOG_TO_FILE") {
            match to_file.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => {}
                "false" | "0" | "no" => config.log_dir = None,
                _ => return Err(invalid("LOG_TO_FILE", to_file)),
            }
        }

        Ok(config)
    }
}

fn invalid(key: &str, value: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    }
}
