// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error taxonomy shared by the server and the client.
//!
//! ```text
//! UaError
//! ├── NotFound          - unknown node or session
//! ├── AccessDenied      - access flags or authorization
//! ├── TypeMismatch      - value coercion failure
//! ├── SecurityRejected  - security negotiation failure
//! ├── ConnectionFailed  - transport failure or retry exhaustion
//! ├── SessionExpired    - idle timeout or invalidated session
//! └── Fatal             - unrecoverable startup or protocol failure
//! ```
//!
//! Per-item results in batched reads and writes are reported as
//! [`StatusCode`]s, not as `UaError`. A `UaError` rejects a whole call.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::status::StatusCode;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown node or session.
    NotFound,
    /// Access flags or authorization denied the operation.
    AccessDenied,
    /// A value could not be coerced to the declared type.
    TypeMismatch,
    /// Security negotiation failed.
    SecurityRejected,
    /// Transport failure or connection retries exhausted.
    ConnectionFailed,
    /// The session timed out or was invalidated.
    SessionExpired,
    /// Unrecoverable failure.
    Fatal,
}

impl ErrorKind {
    /// Returns the category name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::TypeMismatch => "type_mismatch",
            Self::SecurityRejected => "security_rejected",
            Self::ConnectionFailed => "connection_failed",
            Self::SessionExpired => "session_expired",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that reject a whole call.
#[derive(Debug, Error)]
pub enum UaError {
    /// Unknown node or session.
    #[error("{what} not found: {status}")]
    NotFound {
        /// What was looked up.
        what: String,
        /// Status reported by the server.
        status: StatusCode,
    },

    /// Operation denied.
    #[error("Access denied: {reason}")]
    AccessDenied {
        /// Why access was denied.
        reason: String,
        /// Status reported by the server.
        status: StatusCode,
    },

    /// Value coercion failed.
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// Security negotiation failed.
    #[error("Security rejected: {status}")]
    SecurityRejected {
        /// Generic rejection status.
        status: StatusCode,
    },

    /// Connection could not be established or was lost.
    #[error("Connection to '{endpoint}' failed: {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        endpoint: String,
        /// Failure description.
        message: String,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Retries exhausted.
    #[error("Connection to '{endpoint}' failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Endpoint URL.
        endpoint: String,
        /// Number of attempts made.
        attempts: u32,
        /// Message of the last failure.
        last_error: String,
    },

    /// The endpoint list is not available yet.
    #[error("Server endpoints are not known yet at '{endpoint}'")]
    EndpointsNotKnown {
        /// Endpoint URL.
        endpoint: String,
    },

    /// Session closed, expired or unknown.
    #[error("Session {session_id} expired: {status}")]
    SessionExpired {
        /// Session identifier.
        session_id: String,
        /// Status reported by the server.
        status: StatusCode,
    },

    /// A round trip did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A service returned a fault that does not fit another category.
    #[error("Service fault: {status}")]
    ServiceFault {
        /// Fault status.
        status: StatusCode,
    },

    /// Malformed frame or unexpected message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Unrecoverable failure.
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl UaError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a connection failure.
    pub fn connection_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            endpoint: endpoint.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection failure from an I/O error.
    pub fn connection_io(endpoint: impl Into<String>, source: std::io::Error) -> Self {
        Self::ConnectionFailed {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a session expiry error.
    pub fn session_expired(session_id: impl fmt::Display, status: StatusCode) -> Self {
        Self::SessionExpired {
            session_id: session_id.to_string(),
            status,
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Converts a service fault status into the matching error variant.
    pub fn from_status(status: StatusCode, context: impl Into<String>) -> Self {
        let context = context.into();
        match status.kind() {
            Some(ErrorKind::NotFound) => Self::NotFound {
                what: context,
                status,
            },
            Some(ErrorKind::AccessDenied) => Self::AccessDenied {
                reason: context,
                status,
            },
            Some(ErrorKind::TypeMismatch) => Self::TypeMismatch { message: context },
            Some(ErrorKind::SecurityRejected) => Self::SecurityRejected { status },
            Some(ErrorKind::SessionExpired) => Self::SessionExpired {
                session_id: context,
                status,
            },
            Some(ErrorKind::ConnectionFailed) => Self::ConnectionFailed {
                endpoint: context,
                message: status.to_string(),
                source: None,
            },
            _ => Self::ServiceFault { status },
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::SecurityRejected { .. } => ErrorKind::SecurityRejected,
            Self::ConnectionFailed { .. }
            | Self::RetriesExhausted { .. }
            | Self::EndpointsNotKnown { .. }
            | Self::Timeout(_) => ErrorKind::ConnectionFailed,
            Self::SessionExpired { .. } => ErrorKind::SessionExpired,
            Self::ServiceFault { status } => status.kind().unwrap_or(ErrorKind::Fatal),
            Self::Protocol(_) | Self::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Returns the status code carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { status, .. }
            | Self::AccessDenied { status, .. }
            | Self::SecurityRejected { status }
            | Self::SessionExpired { status, .. }
            | Self::ServiceFault { status } => Some(*status),
            Self::TypeMismatch { .. } => Some(StatusCode::BAD_TYPE_MISMATCH),
            Self::Timeout(_) => Some(StatusCode::BAD_TIMEOUT),
            _ => None,
        }
    }

    /// Returns `true` if a fresh connection attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout(_) | Self::EndpointsNotKnown { .. }
        )
    }

    /// Returns `true` if the caller must re-establish its session.
    pub fn requires_new_session(&self) -> bool {
        self.kind() == ErrorKind::SessionExpired
    }

    /// Returns an operator hint for errors with a known remedy.
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            Self::EndpointsNotKnown { .. } => Some(
                "Server may not be fully initialized. Please ensure the server is running and try again.",
            ),
            Self::RetriesExhausted { .. } | Self::ConnectionFailed { .. } => {
                Some("Check that the server is running and the endpoint URL is correct.")
            }
            Self::SecurityRejected { .. } => {
                Some("Use a security mode and policy pair advertised by the server.")
            }
            Self::SessionExpired { .. } => Some("Create a new session and retry."),
            _ => None,
        }
    }
}

/// Result alias for [`UaError`].
pub type UaResult<T> = Result<T, UaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            UaError::connection_failed("opc.tcp://x", "refused").kind(),
            ErrorKind::ConnectionFailed
        );
        assert_eq!(
            UaError::session_expired("s-1", StatusCode::BAD_SESSION_CLOSED).kind(),
            ErrorKind::SessionExpired
        );
        assert_eq!(UaError::Fatal("boom".into()).kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_from_status() {
        let err = UaError::from_status(StatusCode::BAD_SESSION_ID_INVALID, "s-1");
        assert!(matches!(err, UaError::SessionExpired { .. }));
        assert!(err.requires_new_session());

        let err = UaError::from_status(StatusCode::BAD_SECURITY_POLICY_REJECTED, "open");
        assert_eq!(err.kind(), ErrorKind::SecurityRejected);
        assert_eq!(err.status(), Some(StatusCode::BAD_SECURITY_POLICY_REJECTED));

        let err = UaError::from_status(StatusCode::BAD_NOTHING_TO_DO, "read");
        assert!(matches!(err, UaError::ServiceFault { .. }));
    }

    #[test]
    fn test_retryable() {
        assert!(UaError::connection_failed("x", "y").is_retryable());
        assert!(UaError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!UaError::SecurityRejected {
            status: StatusCode::BAD_SECURITY_POLICY_REJECTED
        }
        .is_retryable());
    }

    #[test]
    fn test_endpoints_not_known_hint() {
        let err = UaError::EndpointsNotKnown {
            endpoint: "opc.tcp://localhost:4334/UA/MyServer".into(),
        };
        assert!(err
            .recovery_hint()
            .unwrap()
            .starts_with("Server may not be fully initialized"));
    }
}
