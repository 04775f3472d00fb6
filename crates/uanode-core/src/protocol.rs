// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Service messages and their framing.
//!
//! Every message travels as one frame: a 4-byte big-endian length followed
//! by a JSON body. Requests and responses are wrapped in an envelope that
//! carries a request id so a client can detect a desynchronised stream.
//!
//! ```text
//! +----------------+-------------------------------+
//! | length (u32BE) | {"request_id":1,"body":{...}} |
//! +----------------+-------------------------------+
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::address_space::ReferenceDescription;
use crate::status::StatusCode;
use crate::types::{
    duration_millis, AttributeId, EndpointDescription, NodeId, SecurityPair, UserIdentity,
};
use crate::variant::{DataValue, Variant};

/// Largest accepted frame body.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Allocates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Secure channel identifier, unique per server process.
pub type ChannelId = u32;

// =============================================================================
// Payloads
// =============================================================================

/// A peer certificate as presented during channel opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerCertificate {
    /// DER-encoded certificate.
    pub der: Vec<u8>,
    /// Subject distinguished name.
    pub subject: String,
    /// Start of validity.
    pub not_before: DateTime<Utc>,
    /// End of validity.
    pub not_after: DateTime<Utc>,
}

impl PeerCertificate {
    /// Returns `true` if `at` lies within the validity window.
    pub fn is_time_valid(&self, at: DateTime<Utc>) -> bool {
        at >= self.not_before && at <= self.not_after
    }
}

/// One item of a read request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadValueId {
    /// Node to read.
    pub node_id: NodeId,
    /// Attribute to read.
    #[serde(default)]
    pub attribute_id: AttributeId,
}

impl ReadValueId {
    /// Reads the Value attribute of `node_id`.
    pub fn value(node_id: NodeId) -> Self {
        Self {
            node_id,
            attribute_id: AttributeId::VALUE,
        }
    }
}

/// One item of a write request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteValue {
    /// Node to write.
    pub node_id: NodeId,
    /// Attribute to write.
    #[serde(default)]
    pub attribute_id: AttributeId,
    /// Value to write.
    pub value: Variant,
}

impl WriteValue {
    /// Writes `value` to the Value attribute of `node_id`.
    pub fn value(node_id: NodeId, value: impl Into<Variant>) -> Self {
        Self {
            node_id,
            attribute_id: AttributeId::VALUE,
            value: value.into(),
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Client-to-server service request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum Request {
    /// First message on a connection.
    Hello {
        /// URL the client connected to.
        endpoint_url: String,
    },
    /// Lists the advertised endpoints.
    GetEndpoints,
    /// Negotiates security for this connection.
    OpenSecureChannel {
        /// Requested mode and policy.
        security: SecurityPair,
        /// Client certificate, required for signed modes.
        client_certificate: Option<PeerCertificate>,
    },
    /// Creates and activates a session bound to this channel.
    CreateSession {
        /// Client-chosen session name.
        session_name: String,
        /// Identity token.
        identity: UserIdentity,
        /// Requested idle timeout.
        #[serde(with = "duration_millis")]
        requested_timeout: Duration,
    },
    /// Re-binds an existing session to this channel.
    ActivateSession {
        /// Session to re-bind.
        session_id: SessionId,
        /// Identity token; must match the one used at creation.
        identity: UserIdentity,
    },
    /// Batched attribute read.
    Read {
        /// Session.
        session_id: SessionId,
        /// Items, in order.
        items: Vec<ReadValueId>,
        /// Server-side deadline in milliseconds, 0 for none.
        #[serde(default)]
        timeout_hint_ms: u64,
    },
    /// Batched attribute write.
    Write {
        /// Session.
        session_id: SessionId,
        /// Items, in order.
        items: Vec<WriteValue>,
        /// Server-side deadline in milliseconds, 0 for none.
        #[serde(default)]
        timeout_hint_ms: u64,
    },
    /// Lists the children of a node.
    Browse {
        /// Session.
        session_id: SessionId,
        /// Node to browse.
        node_id: NodeId,
    },
    /// Closes a session.
    CloseSession {
        /// Session to close.
        session_id: SessionId,
    },
    /// Closes the channel; the server drops the connection afterwards.
    CloseSecureChannel,
}

impl Request {
    /// Returns the service name for logging.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "Hello",
            Self::GetEndpoints => "GetEndpoints",
            Self::OpenSecureChannel { .. } => "OpenSecureChannel",
            Self::CreateSession { .. } => "CreateSession",
            Self::ActivateSession { .. } => "ActivateSession",
            Self::Read { .. } => "Read",
            Self::Write { .. } => "Write",
            Self::Browse { .. } => "Browse",
            Self::CloseSession { .. } => "CloseSession",
            Self::CloseSecureChannel => "CloseSecureChannel",
        }
    }
}

/// Server-to-client service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum Response {
    /// Answer to `Hello`.
    Acknowledge {
        /// Server application URI.
        server_uri: String,
    },
    /// Answer to `GetEndpoints`.
    Endpoints {
        /// Advertised endpoints.
        endpoints: Vec<EndpointDescription>,
    },
    /// Answer to `OpenSecureChannel`.
    ChannelOpened {
        /// Assigned channel id.
        channel_id: ChannelId,
        /// Selected mode and policy.
        security: SecurityPair,
    },
    /// Answer to `CreateSession`.
    SessionCreated {
        /// Assigned session id.
        session_id: SessionId,
        /// Idle timeout the server will enforce.
        #[serde(with = "duration_millis")]
        revised_timeout: Duration,
    },
    /// Answer to `ActivateSession`.
    SessionActivated {
        /// Re-bound session.
        session_id: SessionId,
    },
    /// Answer to `Read`, one entry per item.
    ReadResults {
        /// Results in request order.
        results: Vec<DataValue>,
    },
    /// Answer to `Write`, one entry per item.
    WriteResults {
        /// Results in request order.
        results: Vec<StatusCode>,
    },
    /// Answer to `Browse`.
    BrowseResults {
        /// Child references.
        references: Vec<ReferenceDescription>,
    },
    /// Answer to `CloseSession`.
    SessionClosed,
    /// Answer to `CloseSecureChannel`.
    ChannelClosed,
    /// The whole request failed.
    ServiceFault {
        /// Reason.
        status: StatusCode,
    },
}

impl Response {
    /// Creates a fault response.
    pub fn fault(status: StatusCode) -> Self {
        Self::ServiceFault { status }
    }

    /// Returns the fault status, if this is a fault.
    pub fn fault_status(&self) -> Option<StatusCode> {
        match self {
            Self::ServiceFault { status } => Some(*status),
            _ => None,
        }
    }
}

/// Envelope pairing a message with its request id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Request id, echoed in the response.
    pub request_id: u32,
    /// The message.
    pub body: T,
}

// =============================================================================
// Framing
// =============================================================================

/// Framing errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame length above [`MAX_FRAME_SIZE`].
    #[error("Frame of {0} bytes exceeds the maximum size")]
    FrameTooLarge(usize),

    /// The body is not a valid message.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Writes one frame.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(body.len()));
    }
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, CodecError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}
