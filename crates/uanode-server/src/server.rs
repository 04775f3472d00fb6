// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The server service handler.
//!
//! [`UaServer`] owns the address space, the session table and the security
//! negotiator. Each accepted connection gets a [`ServerConnection`] that
//! tracks its secure channel and dispatches requests in arrival order.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use uanode_config::UaNodeConfig;
//! use uanode_core::protocol::{Request, Response};
//! use uanode_server::UaServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = UaServer::builder(Arc::new(UaNodeConfig::default())).build()?;
//! server.start();
//!
//! let mut conn = server.open_connection("in-process");
//! let ack = conn
//!     .handle(Request::Hello { endpoint_url: server.endpoint_url() })
//!     .await;
//! assert!(matches!(ack, Response::Acknowledge { .. }));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uanode_config::UaNodeConfig;
use uanode_core::access::{AccessController, AuthorizationContext};
use uanode_core::address_space::{HostInfo, NodeStore, SystemHostInfo};
use uanode_core::protocol::{ChannelId, PeerCertificate, Request, Response, SessionId};
use uanode_core::status::StatusCode;
use uanode_core::types::{EndpointDescription, SecurityPair, UserIdentity};

use crate::device::{build_address_space, DeviceNodes};
use crate::endpoint::{build_endpoints, log_endpoints};
use crate::error::ServerResult;
use crate::exchange::AttributeExchange;
use crate::security::{
    CertificateStore, MemoryStore, NegotiationOutcome, SecurityNegotiator, StoreValidator,
};
use crate::session::{
    CloseReason, IdentityPolicy, SessionConfig, SessionManager, SessionStatsSnapshot,
};
use crate::simulator::ValueSimulator;

// =============================================================================
// ServerState
// =============================================================================

/// Lifecycle of the server as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Built but not yet serving; endpoints are not published.
    Initializing,
    /// Serving requests.
    Running,
    /// Closing sessions.
    ShuttingDown,
    /// Stopped.
    Halted,
}

impl ServerState {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Halted => "halted",
        }
    }

    /// Status returned to service calls made in this state, if refused.
    fn refusal(&self) -> Option<StatusCode> {
        match self {
            Self::Running => None,
            Self::Initializing => Some(StatusCode::BAD_SERVER_NOT_CONNECTED),
            Self::ShuttingDown | Self::Halted => Some(StatusCode::BAD_SERVER_HALTED),
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`UaServer`].
pub struct UaServerBuilder {
    config: Arc<UaNodeConfig>,
    host: Option<Arc<dyn HostInfo>>,
    certificate_store: Option<Arc<dyn CertificateStore>>,
}

impl UaServerBuilder {
    /// Sets the host information source of the computed variables.
    pub fn host_info(mut self, host: Arc<dyn HostInfo>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the certificate store. Defaults to an in-memory store.
    pub fn certificate_store(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.certificate_store = Some(store);
        self
    }

    /// Builds the address space and the service components.
    pub fn build(self) -> ServerResult<UaServer> {
        let config = self.config;
        config.validate()?;

        let host: Arc<dyn HostInfo> = match self.host {
            Some(host) => host,
            None => Arc::new(SystemHostInfo::new()),
        };
        let (store, nodes) =
            build_address_space(&config.server.application_uri, &config.variables.ranges, host)?;
        let store = Arc::new(store);

        let cert_store: Arc<dyn CertificateStore> = match self.certificate_store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let validator = Arc::new(StoreValidator::new(
            cert_store,
            config.security.reject_unauthorized,
        ));
        let negotiator = SecurityNegotiator::new(config.security.endpoints.clone(), validator);

        let sessions = Arc::new(SessionManager::new(
            SessionConfig::from_config(&config.server),
            IdentityPolicy::from_config(&config.security),
        ));
        let exchange = AttributeExchange::new(
            Arc::clone(&store),
            AccessController::new(config.security.allow_anonymous),
        );

        Ok(UaServer {
            inner: Arc::new(ServerInner {
                endpoints: build_endpoints(&config),
                config,
                nodes,
                negotiator,
                sessions,
                exchange,
                state: RwLock::new(ServerState::Initializing),
                next_channel_id: AtomicU32::new(1),
                open_connections: AtomicUsize::new(0),
            }),
        })
    }
}

// =============================================================================
// UaServer
// =============================================================================

struct ServerInner {
    config: Arc<UaNodeConfig>,
    endpoints: Vec<EndpointDescription>,
    nodes: DeviceNodes,
    negotiator: SecurityNegotiator,
    sessions: Arc<SessionManager>,
    exchange: AttributeExchange,
    state: RwLock<ServerState>,
    next_channel_id: AtomicU32,
    open_connections: AtomicUsize,
}

/// The server. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct UaServer {
    inner: Arc<ServerInner>,
}

impl UaServer {
    /// Starts building a server for `config`.
    pub fn builder(config: Arc<UaNodeConfig>) -> UaServerBuilder {
        UaServerBuilder {
            config,
            host: None,
            certificate_store: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Arc<UaNodeConfig> {
        &self.inner.config
    }

    /// Returns the advertised endpoints.
    pub fn endpoints(&self) -> &[EndpointDescription] {
        &self.inner.endpoints
    }

    /// Returns the primary endpoint URL.
    pub fn endpoint_url(&self) -> String {
        self.inner.config.endpoint_url()
    }

    /// Returns the sample node ids.
    pub fn nodes(&self) -> &DeviceNodes {
        &self.inner.nodes
    }

    /// Returns the address space.
    pub fn node_store(&self) -> &Arc<NodeStore> {
        self.inner.exchange.store()
    }

    /// Returns the session table.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.inner.sessions
    }

    /// Returns session counters.
    pub fn session_stats(&self) -> SessionStatsSnapshot {
        self.inner.sessions.stats()
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ServerState {
        *self.inner.state.read()
    }

    /// Returns the number of open connections.
    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::Relaxed)
    }

    /// Publishes the endpoints and starts accepting service calls.
    pub fn start(&self) {
        *self.inner.state.write() = ServerState::Running;
        log_endpoints(&self.inner.endpoints);
        tracing::info!(
            endpoints = self.inner.endpoints.len(),
            "Server ready"
        );
    }

    /// Starts the session sweep and, when enabled, the value simulator.
    pub fn spawn_background_tasks(&self, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let mut tasks = vec![self.inner.sessions.spawn_sweeper(shutdown.subscribe())];

        let variables = &self.inner.config.variables;
        if variables.simulation_enabled {
            let simulator = ValueSimulator::new(
                Arc::clone(self.node_store()),
                &self.inner.nodes,
                variables.update_interval,
            );
            tasks.push(simulator.spawn(shutdown.subscribe()));
        }
        tasks
    }

    /// Refuses further calls and closes every session.
    pub fn shutdown(&self) -> usize {
        *self.inner.state.write() = ServerState::ShuttingDown;
        let closed = self.inner.sessions.close_all(CloseReason::Shutdown);
        *self.inner.state.write() = ServerState::Halted;
        tracing::info!(sessions_closed = closed, "Server halted");
        closed
    }

    /// Opens a connection context for a new client.
    pub fn open_connection(&self, peer: impl Into<String>) -> ServerConnection {
        self.inner.open_connections.fetch_add(1, Ordering::Relaxed);
        let peer = peer.into();
        tracing::debug!(peer = %peer, "Connection opened");
        ServerConnection {
            server: self.clone(),
            peer,
            greeted: false,
            channel: None,
            closed: false,
        }
    }

    fn allocate_channel_id(&self) -> ChannelId {
        self.inner.next_channel_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl fmt::Debug for UaServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UaServer")
            .field("endpoint_url", &self.endpoint_url())
            .field("state", &self.state())
            .field("sessions", &self.inner.sessions.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ServerConnection
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct OpenChannel {
    id: ChannelId,
    security: SecurityPair,
}

/// Per-connection state: greeting and secure channel.
///
/// Dropping the connection detaches its sessions; they stay alive until
/// re-bound from a new channel or swept.
#[derive(Debug)]
pub struct ServerConnection {
    server: UaServer,
    peer: String,
    greeted: bool,
    channel: Option<OpenChannel>,
    closed: bool,
}

impl ServerConnection {
    /// Returns the open channel id, if any.
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel.map(|c| c.id)
    }

    /// Returns `true` after `CloseSecureChannel`.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Handles one request.
    pub async fn handle(&mut self, request: Request) -> Response {
        let service = request.service_name();
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(status) => {
                tracing::debug!(
                    peer = %self.peer,
                    service,
                    status = %status,
                    "Service fault"
                );
                Response::fault(status)
            }
        }
    }

    async fn dispatch(&mut self, request: Request) -> Result<Response, StatusCode> {
        if self.closed {
            return Err(StatusCode::BAD_SECURE_CHANNEL_ID_INVALID);
        }
        if let Request::Hello { endpoint_url } = &request {
            self.greeted = true;
            tracing::debug!(peer = %self.peer, endpoint_url = %endpoint_url, "Hello received");
            return Ok(Response::Acknowledge {
                server_uri: self.server.inner.config.server.application_uri.clone(),
            });
        }
        if !self.greeted {
            return Err(StatusCode::BAD_REQUEST_HEADER_INVALID);
        }

        if matches!(request, Request::GetEndpoints) {
            return self.get_endpoints();
        }
        if let Some(status) = self.server.state().refusal() {
            return Err(status);
        }

        match request {
            Request::OpenSecureChannel {
                security,
                client_certificate,
            } => self.open_channel(security, client_certificate.as_ref()).await,
            Request::CreateSession {
                session_name,
                identity,
                requested_timeout,
            } => self.create_session(&session_name, &identity, requested_timeout),
            Request::ActivateSession {
                session_id,
                identity,
            } => {
                let channel = self.require_channel()?;
                self.server
                    .inner
                    .sessions
                    .activate_session(channel.id, &session_id, &identity)?;
                Ok(Response::SessionActivated { session_id })
            }
            Request::Read {
                session_id,
                items,
                timeout_hint_ms,
            } => {
                let auth = self.begin(&session_id)?;
                if items.is_empty() {
                    return Err(StatusCode::BAD_NOTHING_TO_DO);
                }
                let results =
                    self.server
                        .inner
                        .exchange
                        .read(&auth, &items, deadline(timeout_hint_ms));
                Ok(Response::ReadResults { results })
            }
            Request::Write {
                session_id,
                items,
                timeout_hint_ms,
            } => {
                let auth = self.begin(&session_id)?;
                if items.is_empty() {
                    return Err(StatusCode::BAD_NOTHING_TO_DO);
                }
                let results = self.server.inner.exchange.write(
                    session_id.as_str(),
                    &auth,
                    &items,
                    deadline(timeout_hint_ms),
                );
                Ok(Response::WriteResults { results })
            }
            Request::Browse {
                session_id,
                node_id,
            } => {
                self.begin(&session_id)?;
                let references = self.server.inner.exchange.browse(&node_id)?;
                Ok(Response::BrowseResults { references })
            }
            Request::CloseSession { session_id } => {
                let channel = self.require_channel()?;
                self.server
                    .inner
                    .sessions
                    .close_session(&session_id, channel.id)?;
                Ok(Response::SessionClosed)
            }
            Request::CloseSecureChannel => {
                self.close_channel();
                Ok(Response::ChannelClosed)
            }
            Request::Hello { .. } | Request::GetEndpoints => {
                Err(StatusCode::BAD_SERVICE_UNSUPPORTED)
            }
        }
    }

    fn get_endpoints(&self) -> Result<Response, StatusCode> {
        match self.server.state() {
            ServerState::Initializing => Ok(Response::Endpoints {
                endpoints: Vec::new(),
            }),
            ServerState::Running => Ok(Response::Endpoints {
                endpoints: self.server.inner.endpoints.clone(),
            }),
            ServerState::ShuttingDown | ServerState::Halted => Err(StatusCode::BAD_SERVER_HALTED),
        }
    }

    async fn open_channel(
        &mut self,
        security: SecurityPair,
        certificate: Option<&PeerCertificate>,
    ) -> Result<Response, StatusCode> {
        match self.server.inner.negotiator.negotiate(security, certificate).await {
            NegotiationOutcome::Selected(selected) => {
                if let Some(previous) = self.channel.take() {
                    self.server.inner.sessions.detach_channel(previous.id);
                }
                let id = self.server.allocate_channel_id();
                self.channel = Some(OpenChannel {
                    id,
                    security: selected,
                });
                tracing::debug!(
                    peer = %self.peer,
                    channel_id = id,
                    security = %selected,
                    "Secure channel opened"
                );
                Ok(Response::ChannelOpened {
                    channel_id: id,
                    security: selected,
                })
            }
            NegotiationOutcome::Rejected(status) => Err(status),
        }
    }

    fn create_session(
        &self,
        name: &str,
        identity: &UserIdentity,
        requested_timeout: Duration,
    ) -> Result<Response, StatusCode> {
        let channel = self.require_channel()?;
        let created = self.server.inner.sessions.create_session(
            channel.id,
            channel.security,
            name,
            identity,
            requested_timeout,
        )?;
        Ok(Response::SessionCreated {
            session_id: created.session_id,
            revised_timeout: created.revised_timeout,
        })
    }

    fn begin(&self, session_id: &SessionId) -> Result<AuthorizationContext, StatusCode> {
        let channel = self.require_channel()?;
        self.server.inner.sessions.begin_request(session_id, channel.id)
    }

    fn require_channel(&self) -> Result<OpenChannel, StatusCode> {
        self.channel.ok_or(StatusCode::BAD_SECURE_CHANNEL_ID_INVALID)
    }

    fn close_channel(&mut self) {
        if let Some(channel) = self.channel.take() {
            self.server.inner.sessions.detach_channel(channel.id);
            tracing::debug!(peer = %self.peer, channel_id = channel.id, "Secure channel closed");
        }
        self.closed = true;
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            self.server.inner.sessions.detach_channel(channel.id);
        }
        self.server
            .inner
            .open_connections
            .fetch_sub(1, Ordering::Relaxed);
        tracing::debug!(peer = %self.peer, "Connection dropped");
    }
}

fn deadline(timeout_hint_ms: u64) -> Option<Instant> {
    (timeout_hint_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_hint_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uanode_core::address_space::{FixedHostInfo, HostSnapshot};
    use uanode_core::protocol::{ReadValueId, WriteValue};
    use uanode_core::types::{NodeId, SecurityMode, SecurityPolicy};
    use uanode_core::variant::Variant;

    fn server_with(config: UaNodeConfig) -> UaServer {
        let host = Arc::new(FixedHostInfo::new(HostSnapshot {
            hostname: "plc-01".into(),
            process_uptime: Duration::from_secs(5),
            load_average_1m: 0.25,
        }));
        UaServer::builder(Arc::new(config))
            .host_info(host)
            .build()
            .unwrap()
    }

    fn server() -> UaServer {
        let s = server_with(UaNodeConfig::default());
        s.start();
        s
    }

    async fn session(conn: &mut ServerConnection) -> SessionId {
        conn.handle(Request::Hello {
            endpoint_url: "opc.tcp://localhost:4334/UA/MyServer".into(),
        })
        .await;
        conn.handle(Request::OpenSecureChannel {
            security: SecurityPair::none(),
            client_certificate: None,
        })
        .await;
        match conn
            .handle(Request::CreateSession {
                session_name: "test".into(),
                identity: UserIdentity::Anonymous,
                requested_timeout: Duration::from_secs(30),
            })
            .await
        {
            Response::SessionCreated { session_id, .. } => session_id,
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_requires_hello() {
        let s = server();
        let mut conn = s.open_connection("t");
        let response = conn.handle(Request::GetEndpoints).await;
        assert_eq!(
            response.fault_status(),
            Some(StatusCode::BAD_REQUEST_HEADER_INVALID)
        );
    }

    #[tokio::test]
    async fn test_endpoints_unknown_until_started() {
        let s = server_with(UaNodeConfig::default());
        let mut conn = s.open_connection("t");
        conn.handle(Request::Hello {
            endpoint_url: s.endpoint_url(),
        })
        .await;
        assert_eq!(
            conn.handle(Request::GetEndpoints).await,
            Response::Endpoints { endpoints: vec![] }
        );

        s.start();
        match conn.handle(Request::GetEndpoints).await {
            Response::Endpoints { endpoints } => assert_eq!(endpoints.len(), 1),
            other => panic!("unexpected response: {:?}", other),
        }

        s.shutdown();
        assert_eq!(
            conn.handle(Request::GetEndpoints).await.fault_status(),
            Some(StatusCode::BAD_SERVER_HALTED)
        );
    }

    #[tokio::test]
    async fn test_read_write_cycle() {
        let s = server();
        let mut conn = s.open_connection("t");
        let id = session(&mut conn).await;
        let nodes = s.nodes().clone();

        let write = conn
            .handle(Request::Write {
                session_id: id.clone(),
                items: vec![
                    WriteValue::value(nodes.temperature.clone(), 26.5),
                    WriteValue::value(nodes.host_name.clone(), "x"),
                ],
                timeout_hint_ms: 0,
            })
            .await;
        assert_eq!(
            write,
            Response::WriteResults {
                results: vec![StatusCode::GOOD, StatusCode::BAD_NOT_WRITABLE]
            }
        );

        match conn
            .handle(Request::Read {
                session_id: id,
                items: vec![
                    ReadValueId::value(nodes.temperature.clone()),
                    ReadValueId::value(NodeId::string(1, "Bogus")),
                ],
                timeout_hint_ms: 1000,
            })
            .await
        {
            Response::ReadResults { results } => {
                assert_eq!(results[0].value, Some(Variant::Double(26.5)));
                assert_eq!(results[1].status, StatusCode::BAD_NODE_ID_UNKNOWN);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unadvertised_security_rejected() {
        let s = server();
        let mut conn = s.open_connection("t");
        conn.handle(Request::Hello {
            endpoint_url: s.endpoint_url(),
        })
        .await;
        let response = conn
            .handle(Request::OpenSecureChannel {
                security: SecurityPair::new(SecurityMode::Sign, SecurityPolicy::Basic256Sha256),
                client_certificate: None,
            })
            .await;
        assert_eq!(
            response.fault_status(),
            Some(StatusCode::BAD_SECURITY_POLICY_REJECTED)
        );
        assert!(conn.channel_id().is_none());
    }

    #[tokio::test]
    async fn test_session_survives_reconnect() {
        let s = server();
        let mut first = s.open_connection("a");
        let id = session(&mut first).await;
        drop(first);

        let mut second = s.open_connection("b");
        second
            .handle(Request::Hello {
                endpoint_url: s.endpoint_url(),
            })
            .await;
        second
            .handle(Request::OpenSecureChannel {
                security: SecurityPair::none(),
                client_certificate: None,
            })
            .await;

        let read = Request::Read {
            session_id: id.clone(),
            items: vec![ReadValueId::value(s.nodes().humidity.clone())],
            timeout_hint_ms: 0,
        };
        assert_eq!(
            second.handle(read.clone()).await.fault_status(),
            Some(StatusCode::BAD_SECURE_CHANNEL_ID_INVALID)
        );

        let activated = second
            .handle(Request::ActivateSession {
                session_id: id.clone(),
                identity: UserIdentity::Anonymous,
            })
            .await;
        assert_eq!(activated, Response::SessionActivated { session_id: id });
        assert!(matches!(
            second.handle(read).await,
            Response::ReadResults { .. }
        ));
        assert_eq!(s.session_stats().rebound, 1);
    }

    #[tokio::test]
    async fn test_close_session_twice() {
        let s = server();
        let mut conn = s.open_connection("t");
        let id = session(&mut conn).await;
        for _ in 0..2 {
            assert_eq!(
                conn.handle(Request::CloseSession {
                    session_id: id.clone()
                })
                .await,
                Response::SessionClosed
            );
        }
    }

    #[tokio::test]
    async fn test_close_session_from_other_channel_rejected() {
        let s = server();
        let mut owner = s.open_connection("a");
        let id = session(&mut owner).await;
        let mut other = s.open_connection("b");
        session(&mut other).await;

        let response = other
            .handle(Request::CloseSession {
                session_id: id.clone(),
            })
            .await;
        assert_eq!(
            response.fault_status(),
            Some(StatusCode::BAD_SECURE_CHANNEL_ID_INVALID)
        );

        let read = owner
            .handle(Request::Read {
                session_id: id,
                items: vec![ReadValueId::value(s.nodes().humidity.clone())],
                timeout_hint_ms: 0,
            })
            .await;
        assert!(matches!(read, Response::ReadResults { .. }));
        assert_eq!(s.session_stats().closed, 0);
    }

    #[tokio::test]
    async fn test_empty_batch_is_nothing_to_do() {
        let s = server();
        let mut conn = s.open_connection("t");
        let id = session(&mut conn).await;
        let response = conn
            .handle(Request::Read {
                session_id: id,
                items: vec![],
                timeout_hint_ms: 0,
            })
            .await;
        assert_eq!(response.fault_status(), Some(StatusCode::BAD_NOTHING_TO_DO));
    }

    #[tokio::test]
    async fn test_shutdown_closes_sessions() {
        let s = server();
        let mut conn = s.open_connection("t");
        let id = session(&mut conn).await;
        assert_eq!(s.shutdown(), 1);
        assert_eq!(s.state(), ServerState::Halted);
        let response = conn
            .handle(Request::Read {
                session_id: id,
                items: vec![ReadValueId::value(s.nodes().temperature.clone())],
                timeout_hint_ms: 0,
            })
            .await;
        assert_eq!(response.fault_status(), Some(StatusCode::BAD_SERVER_HALTED));
    }

    #[tokio::test]
    async fn test_connection_count() {
        let s = server();
        let a = s.open_connection("a");
        let b = s.open_connection("b");
        assert_eq!(s.open_connections(), 2);
        drop(a);
        drop(b);
        assert_eq!(s.open_connections(), 0);
    }
}
