//! Structured logging setup.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Initialize the tracing subscriber for a process embedding the engine.
/// The `RUST_LOG` environment filter takes precedence over the default
/// `info` level.
pub fn init_logging(service_name: &str, format: LogFormat) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true).pretty())
                .try_init()
                .map_err(|e| LoggingError::Init(e.to_string()))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_target(true).with_current_span(true))
                .try_init()
                .map_err(|e| LoggingError::Init(e.to_string()))?;
        }
    }

    tracing::info!(service = %service_name, "logging initialized");
    Ok(())
}

/// Quick setup with sensible defaults
pub fn init_default_logging(service_name: &str) -> Result<(), LoggingError> {
    init_logging(service_name, LogFormat::Pretty)
}
