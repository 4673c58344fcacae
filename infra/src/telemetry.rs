//! Tracing subscriber setup

use bc_shared::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, EnvFilter};

use crate::InfrastructureError;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
///
/// # Returns
/// * `Ok(true)` - Subscriber installed by this call
/// * `Ok(false)` - A subscriber was already installed
/// * `Err(InfrastructureError::Config)` - Unparseable filter directive
pub fn init_tracing(config: &LoggingConfig) -> Result<bool, InfrastructureError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| InfrastructureError::Config(format!("Invalid log filter: {}", e)))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_ansi(config.colored)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.pretty().try_init().is_ok(),
        LogFormat::Compact => builder.compact().try_init().is_ok(),
    };

    Ok(installed)
}
