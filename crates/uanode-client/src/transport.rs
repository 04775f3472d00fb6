// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport abstraction.
//!
//! The connection manager talks to the server through a [`Transport`], so
//! tests can substitute an in-process loopback or a transport that always
//! fails.

use std::fmt;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use uanode_core::error::{UaError, UaResult};
use uanode_core::protocol::{read_frame, write_frame, CodecError, Envelope, Request, Response};

/// Default port when the endpoint URL carries none.
pub const DEFAULT_PORT: u16 = 4840;

const SCHEME: &str = "opc.tcp://";

// =============================================================================
// Transport Trait
// =============================================================================

/// Request/response channel to one server.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Opens the underlying connection.
    async fn connect(&mut self, endpoint_url: &str) -> UaResult<()>;

    /// Sends one request and waits for its response.
    async fn request(&mut self, request: Request) -> UaResult<Response>;

    /// Drops the underlying connection. Safe to call when not connected.
    async fn close(&mut self);

    /// Returns `true` while a connection is open.
    fn is_connected(&self) -> bool;
}

// =============================================================================
// Endpoint URL
// =============================================================================

/// Parts of an `opc.tcp://host:port/path` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Resource path, starting with `/` or empty.
    pub path: String,
}

impl EndpointAddress {
    /// Parses an endpoint URL.
    pub fn parse(url: &str) -> UaResult<Self> {
        let rest = url
            .strip_prefix(SCHEME)
            .ok_or_else(|| UaError::connection_failed(url, "endpoint URL must start with opc.tcp://"))?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(UaError::connection_failed(url, "endpoint URL has no host"));
        }

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| UaError::connection_failed(url, "unterminated IPv6 address"))?;
            (host, tail.strip_prefix(':'))
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };
        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| UaError::connection_failed(url, format!("invalid port '{}'", port)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// Returns `host:port` for socket connection.
    pub fn socket_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

// =============================================================================
// TcpTransport
// =============================================================================

struct TcpConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Framed TCP transport.
#[derive(Default)]
pub struct TcpTransport {
    connection: Option<TcpConnection>,
    endpoint: String,
    next_request_id: u32,
}

impl TcpTransport {
    /// Creates a disconnected transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn lost(&mut self, message: impl Into<String>) -> UaError {
        self.connection = None;
        UaError::connection_failed(&self.endpoint, message)
    }
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, endpoint_url: &str) -> UaResult<()> {
        let address = EndpointAddress::parse(endpoint_url)?;
        self.endpoint = endpoint_url.to_string();
        self.connection = None;

        let stream = TcpStream::connect(address.socket_address())
            .await
            .map_err(|e| UaError::connection_io(endpoint_url, e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| UaError::connection_io(endpoint_url, e))?;

        let (read_half, writer) = stream.into_split();
        self.connection = Some(TcpConnection {
            reader: BufReader::new(read_half),
            writer,
        });
        tracing::debug!(endpoint = %endpoint_url, "TCP connection established");
        Ok(())
    }

    async fn request(&mut self, request: Request) -> UaResult<Response> {
        self.next_request_id = self.next_request_id.wrapping_add(1);
        let request_id = self.next_request_id;

        let Some(conn) = self.connection.as_mut() else {
            return Err(UaError::connection_failed(&self.endpoint, "not connected"));
        };

        let envelope = Envelope {
            request_id,
            body: request,
        };
        if let Err(e) = write_frame(&mut conn.writer, &envelope).await {
            return Err(self.lost(e.to_string()));
        }

        let reply: Option<Envelope<Response>> = match read_frame(&mut conn.reader).await {
            Ok(reply) => reply,
            Err(CodecError::Malformed(e)) => {
                self.connection = None;
                return Err(UaError::protocol(format!("malformed response: {}", e)));
            }
            Err(e) => return Err(self.lost(e.to_string())),
        };

        match reply {
            Some(reply) if reply.request_id == request_id => Ok(reply.body),
            Some(reply) if reply.request_id == 0 => Ok(reply.body),
            Some(reply) => {
                self.connection = None;
                Err(UaError::protocol(format!(
                    "response id {} does not match request id {}",
                    reply.request_id, request_id
                )))
            }
            None => Err(self.lost("connection closed by server")),
        }
    }

    async fn close(&mut self) {
        if self.connection.take().is_some() {
            tracing::debug!(endpoint = %self.endpoint, "TCP connection closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}
