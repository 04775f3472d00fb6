// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service and item status codes.
//!
//! A [`StatusCode`] is the 32-bit result attached to every read item, write
//! item and service fault. The top two bits carry the severity: `00` good,
//! `01` uncertain, `10` bad.
//!
//! # Examples
//!
//! ```
//! use uanode_core::status::StatusCode;
//!
//! assert!(StatusCode::GOOD.is_good());
//! assert!(StatusCode::BAD_NODE_ID_UNKNOWN.is_bad());
//! assert_eq!(StatusCode::BAD_NOT_WRITABLE.name(), "BadNotWritable");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// A status code returned by services and per-item results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(u32);

impl StatusCode {
    /// The operation succeeded.
    pub const GOOD: Self = Self(0x0000_0000);
    /// The value is usable but its quality is uncertain.
    pub const UNCERTAIN: Self = Self(0x4000_0000);
    /// Generic bad result.
    pub const BAD: Self = Self(0x8000_0000);

    /// An unexpected error occurred.
    pub const BAD_UNEXPECTED_ERROR: Self = Self(0x8001_0000);
    /// An internal error occurred as a result of a programming or configuration error.
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8002_0000);
    /// A low level communication error occurred.
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    /// Decoding halted because of invalid data in the stream.
    pub const BAD_DECODING_ERROR: Self = Self(0x8007_0000);
    /// The operation timed out.
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    /// The server does not support the requested service.
    pub const BAD_SERVICE_UNSUPPORTED: Self = Self(0x800B_0000);
    /// The operation was cancelled because the application is shutting down.
    pub const BAD_SHUTDOWN: Self = Self(0x800C_0000);
    /// The operation could not complete because the client is not connected to the server.
    pub const BAD_SERVER_NOT_CONNECTED: Self = Self(0x800D_0000);
    /// The server has stopped and cannot process any requests.
    pub const BAD_SERVER_HALTED: Self = Self(0x800E_0000);
    /// There was nothing to do because the client passed a list of operations with no elements.
    pub const BAD_NOTHING_TO_DO: Self = Self(0x800F_0000);
    /// The request could not be processed because it specified too many operations.
    pub const BAD_TOO_MANY_OPERATIONS: Self = Self(0x8010_0000);
    /// The certificate provided as a parameter is not valid.
    pub const BAD_CERTIFICATE_INVALID: Self = Self(0x8012_0000);
    /// User does not have permission to perform the requested operation.
    pub const BAD_USER_ACCESS_DENIED: Self = Self(0x801F_0000);
    /// The user identity token is not valid.
    pub const BAD_IDENTITY_TOKEN_INVALID: Self = Self(0x8020_0000);
    /// The user identity token is valid but the server has rejected it.
    pub const BAD_IDENTITY_TOKEN_REJECTED: Self = Self(0x8021_0000);
    /// The specified secure channel is no longer valid.
    pub const BAD_SECURE_CHANNEL_ID_INVALID: Self = Self(0x8022_0000);
    /// The session id is not valid.
    pub const BAD_SESSION_ID_INVALID: Self = Self(0x8025_0000);
    /// The session was closed by the client or timed out.
    pub const BAD_SESSION_CLOSED: Self = Self(0x8026_0000);
    /// The session cannot be used because ActivateSession has not been called.
    pub const BAD_SESSION_NOT_ACTIVATED: Self = Self(0x8027_0000);
    /// The header for the request is missing or invalid.
    pub const BAD_REQUEST_HEADER_INVALID: Self = Self(0x802A_0000);
    /// The node id refers to a node that does not exist in the server address space.
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    /// The attribute is not supported for the specified node.
    pub const BAD_ATTRIBUTE_ID_INVALID: Self = Self(0x8035_0000);
    /// The access level does not allow reading or subscribing to the node.
    pub const BAD_NOT_READABLE: Self = Self(0x803A_0000);
    /// The access level does not allow writing to the node.
    pub const BAD_NOT_WRITABLE: Self = Self(0x803B_0000);
    /// The value was out of range.
    pub const BAD_OUT_OF_RANGE: Self = Self(0x803C_0000);
    /// The operation is not supported.
    pub const BAD_NOT_SUPPORTED: Self = Self(0x803D_0000);
    /// The security mode does not meet the requirements set by the server.
    pub const BAD_SECURITY_MODE_REJECTED: Self = Self(0x8054_0000);
    /// The security policy does not meet the requirements set by the server.
    pub const BAD_SECURITY_POLICY_REJECTED: Self = Self(0x8055_0000);
    /// The server has reached its maximum number of sessions.
    pub const BAD_TOO_MANY_SESSIONS: Self = Self(0x8056_0000);
    /// The value supplied for the attribute is not of the same type as the attribute's value.
    pub const BAD_TYPE_MISMATCH: Self = Self(0x8074_0000);
    /// Could not establish a network connection to the remote server.
    pub const BAD_CONNECTION_REJECTED: Self = Self(0x80AC_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;

    /// Creates a status code from its raw value.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns `true` for a good severity.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    /// Returns `true` for an uncertain severity.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0x4000_0000
    }

    /// Returns `true` for a bad severity.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name, or `"Unknown"` for codes not listed here.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::GOOD => "Good",
            Self::UNCERTAIN => "Uncertain",
            Self::BAD => "Bad",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_DECODING_ERROR => "BadDecodingError",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVICE_UNSUPPORTED => "BadServiceUnsupported",
            Self::BAD_SHUTDOWN => "BadShutdown",
            Self::BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            Self::BAD_SERVER_HALTED => "BadServerHalted",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_TOO_MANY_OPERATIONS => "BadTooManyOperations",
            Self::BAD_CERTIFICATE_INVALID => "BadCertificateInvalid",
            Self::BAD_USER_ACCESS_DENIED => "BadUserAccessDenied",
            Self::BAD_IDENTITY_TOKEN_INVALID => "BadIdentityTokenInvalid",
            Self::BAD_IDENTITY_TOKEN_REJECTED => "BadIdentityTokenRejected",
            Self::BAD_SECURE_CHANNEL_ID_INVALID => "BadSecureChannelIdInvalid",
            Self::BAD_SESSION_ID_INVALID => "BadSessionIdInvalid",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_SESSION_NOT_ACTIVATED => "BadSessionNotActivated",
            Self::BAD_REQUEST_HEADER_INVALID => "BadRequestHeaderInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_NOT_READABLE => "BadNotReadable",
            Self::BAD_NOT_WRITABLE => "BadNotWritable",
            Self::BAD_OUT_OF_RANGE => "BadOutOfRange",
            Self::BAD_NOT_SUPPORTED => "BadNotSupported",
            Self::BAD_SECURITY_MODE_REJECTED => "BadSecurityModeRejected",
            Self::BAD_SECURITY_POLICY_REJECTED => "BadSecurityPolicyRejected",
            Self::BAD_TOO_MANY_SESSIONS => "BadTooManySessions",
            Self::BAD_TYPE_MISMATCH => "BadTypeMismatch",
            Self::BAD_CONNECTION_REJECTED => "BadConnectionRejected",
            _ => "Unknown",
        }
    }

    /// Maps a bad status onto the error taxonomy. Returns `None` for good and
    /// uncertain codes.
    pub fn kind(&self) -> Option<ErrorKind> {
        if !self.is_bad() {
            return None;
        }
        let kind = match *self {
            Self::BAD_NODE_ID_UNKNOWN | Self::BAD_ATTRIBUTE_ID_INVALID => ErrorKind::NotFound,
            Self::BAD_NOT_READABLE
            | Self::BAD_NOT_WRITABLE
            | Self::BAD_USER_ACCESS_DENIED
            | Self::BAD_IDENTITY_TOKEN_INVALID
            | Self::BAD_IDENTITY_TOKEN_REJECTED => ErrorKind::AccessDenied,
            Self::BAD_TYPE_MISMATCH | Self::BAD_OUT_OF_RANGE => ErrorKind::TypeMismatch,
            Self::BAD_SECURITY_MODE_REJECTED
            | Self::BAD_SECURITY_POLICY_REJECTED
            | Self::BAD_CERTIFICATE_INVALID => ErrorKind::SecurityRejected,
            Self::BAD_SESSION_ID_INVALID
            | Self::BAD_SESSION_CLOSED
            | Self::BAD_SESSION_NOT_ACTIVATED => ErrorKind::SessionExpired,
            Self::BAD_COMMUNICATION_ERROR
            | Self::BAD_TIMEOUT
            | Self::BAD_SERVER_NOT_CONNECTED
            | Self::BAD_SERVER_HALTED
            | Self::BAD_SHUTDOWN
            | Self::BAD_CONNECTION_REJECTED
            | Self::BAD_SECURE_CHANNEL_ID_INVALID => ErrorKind::ConnectionFailed,
            _ => ErrorKind::Fatal,
        };
        Some(kind)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

impl From<u32> for StatusCode {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(!StatusCode::GOOD.is_bad());
        assert!(StatusCode::UNCERTAIN.is_uncertain());
        assert!(StatusCode::BAD_TIMEOUT.is_bad());
        assert!(!StatusCode::BAD_TIMEOUT.is_good());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            StatusCode::BAD_NODE_ID_UNKNOWN.to_string(),
            "BadNodeIdUnknown (0x80340000)"
        );
        assert_eq!(StatusCode::from_bits(0x8099_0000).name(), "Unknown");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(StatusCode::GOOD.kind(), None);
        assert_eq!(
            StatusCode::BAD_NODE_ID_UNKNOWN.kind(),
            Some(ErrorKind::NotFound)
        );
        assert_eq!(
            StatusCode::BAD_NOT_WRITABLE.kind(),
            Some(ErrorKind::AccessDenied)
        );
        assert_eq!(
            StatusCode::BAD_TYPE_MISMATCH.kind(),
            Some(ErrorKind::TypeMismatch)
        );
        assert_eq!(
            StatusCode::BAD_SESSION_CLOSED.kind(),
            Some(ErrorKind::SessionExpired)
        );
        assert_eq!(
            StatusCode::BAD_SECURITY_POLICY_REJECTED.kind(),
            Some(ErrorKind::SecurityRejected)
        );
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&StatusCode::BAD_NOT_WRITABLE).unwrap();
        assert_eq!(json, "2151350272");
        let back: StatusCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StatusCode::BAD_NOT_WRITABLE);
    }
}
