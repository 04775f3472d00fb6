// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! The level comes from `RUST_LOG` when set, otherwise from the command
//! line, otherwise from the `logging` section of the configuration.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use uanode_config::LoggingConfig;

use crate::cli::{Cli, LogFormat};
use crate::error::{BinError, BinResult};

// =============================================================================
// LogSettings
// =============================================================================

/// Effective logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Append to this file instead of stdout.
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Merges command-line overrides over the configuration.
    pub fn resolve(cli: &Cli, config: Option<&LoggingConfig>) -> Self {
        let level = cli
            .log_level_override()
            .map(str::to_string)
            .or_else(|| config.map(|c| c.level.as_str().to_string()))
            .unwrap_or_else(|| "info".to_string());
        let format = cli
            .log_format
            .or_else(|| config.map(|c| c.format.into()))
            .unwrap_or_default();

        Self {
            level,
            format,
            file: config.and_then(|c| c.file.clone()),
        }
    }
}

// =============================================================================
// Logging Initialization
// =============================================================================

/// Installs the global subscriber.
///
/// Fails if the filter directive is invalid, the log file cannot be
/// opened, or a subscriber is already installed.
pub fn init_logging(settings: &LogSettings) -> BinResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| BinError::config(format!("invalid log level '{}': {}", settings.level, e)))?,
    };

    let (writer, ansi) = match &settings.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| BinError::init(format!("cannot open log file {}: {}", path.display(), e)))?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
        None => (
            BoxMakeWriter::new(std::io::stdout),
            std::io::IsTerminal::is_terminal(&std::io::stdout()),
        ),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match settings.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };

    result.map_err(|e| BinError::init(format!("failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use uanode_config::LogLevel;

    #[test]
    fn test_cli_overrides_config() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            format: uanode_config::LogFormat::Text,
            file: None,
        };

        let cli = Cli::parse_from(["uanode"]);
        let settings = LogSettings::resolve(&cli, Some(&config));
        assert_eq!(settings.level, "warn");
        assert_eq!(settings.format, LogFormat::Text);

        let cli = Cli::parse_from(["uanode", "-v", "--log-format", "json"]);
        let settings = LogSettings::resolve(&cli, Some(&config));
        assert_eq!(settings.level, "debug");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = Cli::parse_from(["uanode"]);
        let settings = LogSettings::resolve(&cli, None);
        assert_eq!(settings.level, "info");
        assert_eq!(settings.format, LogFormat::Json);
        assert!(settings.file.is_none());
    }
}
