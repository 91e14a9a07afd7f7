//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use sg_shared::config::{LogFormat, LoggingConfig};

use crate::InfrastructureError;

/// Installs the global tracing subscriber
///
/// `RUST_LOG` wins over `config.level` when set. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = build_filter(config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    installed.map_err(|e| {
        InfrastructureError::Config(format!("Failed to install tracing subscriber: {}", e))
    })
}

pub(crate) fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, InfrastructureError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        InfrastructureError::Config(format!("Invalid log level '{}': {}", config.level, e))
    })
}
