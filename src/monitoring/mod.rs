//! Monitoring module
//!
//! Provides structured logging with tracing: console output plus a
//! daily-rotated JSON log file.

pub mod config;
pub mod tracing_config;

pub use config::{LogFormat, LoggingConfig};
pub use tracing_config::init_tracing;
