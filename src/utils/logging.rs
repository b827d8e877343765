//! Structured logging setup.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string().to_lowercase()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_format {
        subscriber
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(config.ansi).with_target(true))
            .try_init()
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
    }

    Ok(())
}
