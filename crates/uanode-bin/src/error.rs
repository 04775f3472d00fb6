// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the uanode binary.

use std::process::ExitCode;

use thiserror::Error;
use uanode_config::ConfigError;
use uanode_core::error::UaError;
use uanode_server::ServerError;

/// Result type alias for uanode-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Exit code for initialisation and unrecoverable errors.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for configuration errors.
pub const EXIT_CONFIG: u8 = 2;

/// Errors that can occur in the uanode binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Initialization error.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Runtime error.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Config loading or validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Server startup error.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Client fault.
    #[error("Client error: {0}")]
    Client(#[from] UaError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) | Self::Config(_) => EXIT_CONFIG,
            Self::Server(e) if e.is_config_error() => EXIT_CONFIG,
            Self::WithContext { source, .. } => source.exit_code(),
            _ => EXIT_FAILURE,
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Runtime(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with its cause chain on stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Maps a command result onto the process exit code.
pub fn exit_code(result: BinResult<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uanode_core::StatusCode;

    #[test]
    fn test_error_with_context() {
        let err = BinError::config("inner error").with_context("outer context");
        assert_eq!(err.to_string(), "outer context: Configuration error: inner error");
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("x").exit_code(), 2);
        assert_eq!(BinError::from(ConfigError::validation("server.port", "zero")).exit_code(), 2);
        assert_eq!(
            BinError::from(ServerError::Config(ConfigError::validation("a", "b"))).exit_code(),
            2
        );
        assert_eq!(BinError::init("x").exit_code(), 1);
        assert_eq!(BinError::runtime("x").exit_code(), 1);
        assert_eq!(
            BinError::from(UaError::session_expired("s", StatusCode::BAD_SESSION_CLOSED)).exit_code(),
            1
        );
    }
}
