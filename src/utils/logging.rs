//! Structured logging setup.
//!
//! Builds and installs a `tracing-subscriber` formatter from a
//! [`LoggingConfig`](crate::config::LoggingConfig). Installation is global and
//! can only happen once per process; a second call reports `ConfigError`.

use crate::config::LoggingConfig;
use crate::error::{AmiError, Result};
use std::sync::Arc;
use tracing::info;

/// Install the global log subscriber described by `config`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = config.log_level;

    let installed = if config.log_to_file {
        let path = config.log_file_path.as_deref().ok_or_else(|| {
            AmiError::ConfigError("log_file_path must be set when log_to_file is enabled".into())
        })?;
        let file = std::fs::File::create(path)
            .map_err(|e| AmiError::ConfigError(format!("Failed to open log file: {e}")))?;
        let writer = Arc::new(file);

        if config.json_format {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(writer)
                .json()
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(writer)
                .try_init()
        }
    } else if config.json_format {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_max_level(level).try_init()
    };

    installed
        .map_err(|e| AmiError::ConfigError(format!("Failed to install log subscriber: {e}")))?;

    info!(app = %config.app_name, level = %level, "logging initialised");
    Ok(())
}
