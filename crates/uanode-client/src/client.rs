// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! High-level client API.

use uanode_core::address_space::ReferenceDescription;
use uanode_core::error::{UaError, UaResult};
use uanode_core::protocol::{ReadValueId, Request, Response, SessionId, WriteValue};
use uanode_core::status::StatusCode;
use uanode_core::types::{EndpointDescription, NodeId};
use uanode_core::variant::DataValue;

use crate::connection::{ClientStats, ConnectionManager, ConnectionOptions, ConnectionState};
use crate::transport::{TcpTransport, Transport};

/// Attribute client for one server.
///
/// # Example
///
/// ```rust,ignore
/// let mut client = UaClient::tcp(ConnectionOptions::new("opc.tcp://localhost:4334/UA/MyServer"));
/// client.connect().await?;
/// client.create_session().await?;
/// let values = client.read_values(&[NodeId::string(1, "Temperature")]).await?;
/// client.disconnect().await;
/// ```
#[derive(Debug)]
pub struct UaClient {
    connection: ConnectionManager,
}

impl UaClient {
    /// Creates a client over `transport`.
    pub fn new(transport: Box<dyn Transport>, options: ConnectionOptions) -> Self {
        Self {
            connection: ConnectionManager::new(transport, options),
        }
    }

    /// Creates a client over TCP.
    pub fn tcp(options: ConnectionOptions) -> Self {
        Self::new(Box::new(TcpTransport::new()), options)
    }

    /// Returns the connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Returns the active session id.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.connection.session().map(|s| &s.session_id)
    }

    /// Returns the client counters.
    pub fn stats(&self) -> ClientStats {
        self.connection.stats()
    }

    /// Returns the connection options.
    pub fn options(&self) -> &ConnectionOptions {
        self.connection.options()
    }

    /// Connects with backoff. See [`ConnectionManager::connect`].
    pub async fn connect(&mut self) -> UaResult<()> {
        self.connection.connect().await
    }

    /// Lists the server endpoints.
    pub async fn get_endpoints(&mut self) -> UaResult<Vec<EndpointDescription>> {
        self.connection.get_endpoints().await
    }

    /// Creates a session with the configured identity.
    pub async fn create_session(&mut self) -> UaResult<SessionId> {
        self.connection.create_session().await
    }

    /// Closes the active session.
    pub async fn close_session(&mut self) -> UaResult<()> {
        self.connection.close_session().await
    }

    /// Closes everything. Never fails.
    pub async fn disconnect(&mut self) {
        self.connection.disconnect().await
    }

    // =========================================================================
    // Attribute services
    // =========================================================================

    /// Reads a batch. One result per item, in order.
    pub async fn read(&mut self, items: &[ReadValueId]) -> UaResult<Vec<DataValue>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.connection.stats_mut().reads += 1;
        let timeout_hint_ms = self.timeout_hint_ms();

        let response = self
            .connection
            .session_request(|session_id| Request::Read {
                session_id: session_id.clone(),
                items: items.to_vec(),
                timeout_hint_ms,
            })
            .await?;

        match response {
            Response::ReadResults { results } => {
                check_len("Read", items.len(), results.len())?;
                Ok(results)
            }
            other => Err(UaError::protocol(format!("expected ReadResults, got {:?}", other))),
        }
    }

    /// Reads the Value attribute of each node.
    pub async fn read_values(&mut self, nodes: &[NodeId]) -> UaResult<Vec<DataValue>> {
        let items: Vec<ReadValueId> = nodes.iter().cloned().map(ReadValueId::value).collect();
        self.read(&items).await
    }

    /// Writes a batch. One status per item, in order; items are independent.
    pub async fn write(&mut self, items: &[WriteValue]) -> UaResult<Vec<StatusCode>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.connection.stats_mut().writes += 1;
        let timeout_hint_ms = self.timeout_hint_ms();

        let response = self
            .connection
            .session_request(|session_id| Request::Write {
                session_id: session_id.clone(),
                items: items.to_vec(),
                timeout_hint_ms,
            })
            .await?;

        match response {
            Response::WriteResults { results } => {
                check_len("Write", items.len(), results.len())?;
                Ok(results)
            }
            other => Err(UaError::protocol(format!("expected WriteResults, got {:?}", other))),
        }
    }

    /// Lists the children of `node_id`.
    pub async fn browse(&mut self, node_id: &NodeId) -> UaResult<Vec<ReferenceDescription>> {
        let response = self
            .connection
            .session_request(|session_id| Request::Browse {
                session_id: session_id.clone(),
                node_id: node_id.clone(),
            })
            .await?;

        match response {
            Response::BrowseResults { references } => Ok(references),
            other => Err(UaError::protocol(format!("expected BrowseResults, got {:?}", other))),
        }
    }

    fn timeout_hint_ms(&self) -> u64 {
        self.connection.options().request_timeout.as_millis() as u64
    }
}

fn check_len(service: &str, expected: usize, actual: usize) -> UaResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(UaError::protocol(format!(
            "{} returned {} results for {} items",
            service, actual, expected
        )))
    }
}
