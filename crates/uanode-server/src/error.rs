// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server error types.

use std::path::PathBuf;

use thiserror::Error;
use uanode_config::ConfigError;
use uanode_core::address_space::AddressSpaceError;
use uanode_core::protocol::CodecError;

/// Errors raised while starting or running the server.
///
/// Per-request failures are status codes, not `ServerError`s; this type
/// covers initialisation and the listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be used.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Address space construction failed.
    #[error("Address space error: {0}")]
    AddressSpace(#[from] AddressSpaceError),

    /// Listener could not bind.
    #[error("Failed to bind '{address}': {source}")]
    Bind {
        /// Requested socket address.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// File system operation on the PKI or certificate store failed.
    #[error("Certificate store I/O on '{path}' failed: {source}")]
    StoreIo {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Certificate generation failed.
    #[error("Certificate generation failed: {message}")]
    CertificateGeneration {
        /// Error message.
        message: String,
    },

    /// Unknown certificate thumbprint.
    #[error("Certificate not found: {thumbprint}")]
    CertificateNotFound {
        /// SHA-256 thumbprint.
        thumbprint: String,
    },

    /// Frame-level failure on a connection.
    #[error("Connection error: {0}")]
    Codec(#[from] CodecError),

    /// The server is not running.
    #[error("Server is not running")]
    NotRunning,
}

impl ServerError {
    /// Creates a store I/O error.
    pub fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StoreIo {
            path: path.into(),
            source,
        }
    }

    /// Creates a certificate generation error.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::CertificateGeneration {
            message: message.into(),
        }
    }

    /// Returns `true` for errors caused by the configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result alias for [`ServerError`].
pub type ServerResult<T> = Result<T, ServerError>;
