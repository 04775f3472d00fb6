// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client connection lifecycle.
//!
//! ```text
//! Disconnected → Connecting → Connected → SessionEstablishing → Ready
//!       ▲             │            │                │             │
//!       └─────────────┴────────────┴────────────────┴─────────────┘
//!                       failure or disconnect()
//! ```
//!
//! `connect` retries with exponential backoff. When an established session
//! loses its connection, the manager reconnects with the same backoff and
//! first tries to re-bind the old session id before creating a new one.

use std::fmt;
use std::time::Duration;

use uanode_core::error::{ErrorKind, UaError, UaResult};
use uanode_core::protocol::{ChannelId, PeerCertificate, Request, Response, SessionId};
use uanode_core::retry::{BackoffState, ConnectionStrategy, RetryDecision};
use uanode_core::status::StatusCode;
use uanode_core::types::{EndpointDescription, SecurityPair, UserIdentity};

use crate::transport::Transport;

/// Bound on the best-effort close messages sent by `disconnect`.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// ConnectionState
// =============================================================================

/// State of a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Opening the transport and secure channel.
    Connecting,
    /// Secure channel open, no session.
    Connected,
    /// Creating or re-binding a session.
    SessionEstablishing,
    /// Session active; service calls are accepted.
    Ready,
}

impl ConnectionState {
    /// Returns `true` if a secure channel is open.
    #[inline]
    pub fn has_channel(&self) -> bool {
        matches!(self, Self::Connected | Self::SessionEstablishing | Self::Ready)
    }

    /// Returns `true` in [`ConnectionState::Ready`].
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::SessionEstablishing => write!(f, "SessionEstablishing"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

// =============================================================================
// ConnectionOptions
// =============================================================================

/// Settings of a client connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Server endpoint URL.
    pub endpoint_url: String,
    /// Requested security mode and policy.
    pub security: SecurityPair,
    /// Own certificate, sent when the security mode signs.
    pub client_certificate: Option<PeerCertificate>,
    /// Retry bounds.
    pub strategy: ConnectionStrategy,
    /// Bound on each round trip.
    pub request_timeout: Duration,
    /// Session name sent to the server.
    pub session_name: String,
    /// Requested session idle timeout.
    pub session_timeout: Duration,
    /// Identity token.
    pub identity: UserIdentity,
}

impl ConnectionOptions {
    /// Creates options with defaults for everything but the URL.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            security: SecurityPair::none(),
            client_certificate: None,
            strategy: ConnectionStrategy::default(),
            request_timeout: Duration::from_secs(10),
            session_name: "uanode-client".to_string(),
            session_timeout: Duration::from_secs(60),
            identity: UserIdentity::Anonymous,
        }
    }

    /// Sets the security pair.
    pub fn with_security(mut self, security: SecurityPair) -> Self {
        self.security = security;
        self
    }

    /// Sets the client certificate.
    pub fn with_certificate(mut self, certificate: PeerCertificate) -> Self {
        self.client_certificate = Some(certificate);
        self
    }

    /// Sets the retry bounds.
    pub fn with_strategy(mut self, strategy: ConnectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the round-trip timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the requested session timeout.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Sets the identity token.
    pub fn with_identity(mut self, identity: UserIdentity) -> Self {
        self.identity = identity;
        self
    }
}

// =============================================================================
// ClientStats
// =============================================================================

/// Client counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Connection attempts, successful or not.
    pub connect_attempts: u64,
    /// Reconnections after a lost connection.
    pub reconnects: u64,
    /// Read calls.
    pub reads: u64,
    /// Write calls.
    pub writes: u64,
}

// =============================================================================
// ConnectionManager
// =============================================================================

/// Active session details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    /// Session id.
    pub session_id: SessionId,
    /// Idle timeout enforced by the server.
    pub revised_timeout: Duration,
}

/// Drives a [`Transport`] through the connection state machine.
#[derive(Debug)]
pub struct ConnectionManager {
    transport: Box<dyn Transport>,
    options: ConnectionOptions,
    state: ConnectionState,
    backoff: BackoffState,
    channel_id: Option<ChannelId>,
    session: Option<ActiveSession>,
    stats: ClientStats,
}

impl ConnectionManager {
    /// Creates a disconnected manager.
    pub fn new(transport: Box<dyn Transport>, options: ConnectionOptions) -> Self {
        let backoff = BackoffState::new(options.strategy);
        Self {
            transport,
            options,
            state: ConnectionState::Disconnected,
            backoff,
            channel_id: None,
            session: None,
            stats: ClientStats::default(),
        }
    }

    /// Returns the options.
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the secure channel id.
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id
    }

    /// Returns the active session.
    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    /// Returns the counters.
    pub fn stats(&self) -> ClientStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ClientStats {
        &mut self.stats
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Opens the transport and the secure channel, retrying with backoff.
    ///
    /// Gives up with `RetriesExhausted` after `max_retry` attempts, or with
    /// `EndpointsNotKnown` when the last attempt reached a server that is not
    /// started or already halted. A security rejection is not retried.
    pub async fn connect(&mut self) -> UaResult<()> {
        if self.state.has_channel() {
            return Ok(());
        }
        self.backoff = BackoffState::new(self.options.strategy);
        self.state = ConnectionState::Connecting;
        let endpoint = self.options.endpoint_url.clone();

        loop {
            self.state = ConnectionState::Connecting;
            self.stats.connect_attempts += 1;
            let attempt = self.backoff.failed_attempts() + 1;

            let error = match self.try_connect().await {
                Ok(channel_id) => {
                    self.channel_id = Some(channel_id);
                    self.state = ConnectionState::Connected;
                    self.backoff.reset();
                    tracing::info!(
                        endpoint = %endpoint,
                        channel_id,
                        security = %self.options.security,
                        attempt,
                        "Connected"
                    );
                    return Ok(());
                }
                Err(e) => e,
            };

            self.transport.close().await;
            if !error.is_retryable() {
                self.state = ConnectionState::Disconnected;
                tracing::warn!(endpoint = %endpoint, error = %error, "Connection refused");
                return Err(error);
            }

            match self.backoff.record_failure(error.to_string()) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt,
                        max_retry = self.options.strategy.max_retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Connection attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    self.state = ConnectionState::Disconnected;
                    let attempts = self.backoff.failed_attempts();
                    tracing::error!(
                        endpoint = %endpoint,
                        attempts,
                        error = %error,
                        "Connection failed, retries exhausted"
                    );
                    if matches!(error, UaError::EndpointsNotKnown { .. }) {
                        return Err(error);
                    }
                    return Err(UaError::RetriesExhausted {
                        endpoint,
                        attempts,
                        last_error: error.to_string(),
                    });
                }
            }
        }
    }

    async fn try_connect(&mut self) -> UaResult<ChannelId> {
        let endpoint = self.options.endpoint_url.clone();
        let timeout = self.options.request_timeout;
        match tokio::time::timeout(timeout, self.transport.connect(&endpoint)).await {
            Ok(result) => result?,
            Err(_) => return Err(UaError::Timeout(timeout)),
        }

        let hello = Request::Hello {
            endpoint_url: self.options.endpoint_url.clone(),
        };
        match self.round_trip(hello).await? {
            Response::Acknowledge { server_uri } => {
                tracing::debug!(server_uri = %server_uri, "Server acknowledged");
            }
            other => return Err(self.handshake_error(other, "Acknowledge")),
        }

        let open = Request::OpenSecureChannel {
            security: self.options.security,
            client_certificate: self.options.client_certificate.clone(),
        };
        match self.round_trip(open).await? {
            Response::ChannelOpened { channel_id, .. } => Ok(channel_id),
            other => Err(self.handshake_error(other, "ChannelOpened")),
        }
    }

    /// Reconnects after a lost connection and restores the session.
    ///
    /// The old session id is re-bound with `ActivateSession`; if the server
    /// no longer knows it, a new session is created.
    pub async fn reconnect(&mut self) -> UaResult<()> {
        self.stats.reconnects += 1;
        let previous = self.session.take();
        self.drop_channel().await;
        tracing::info!(
            endpoint = %self.options.endpoint_url,
            session_id = ?previous.as_ref().map(|s| s.session_id.to_string()),
            "Reconnecting"
        );

        if let Err(e) = self.connect().await {
            self.session = previous;
            return Err(e);
        }

        if let Some(previous) = previous {
            self.state = ConnectionState::SessionEstablishing;
            let activate = Request::ActivateSession {
                session_id: previous.session_id.clone(),
                identity: self.options.identity.clone(),
            };
            match self.round_trip(activate).await {
                Ok(Response::SessionActivated { session_id }) => {
                    tracing::info!(session_id = %session_id, "Session re-bound");
                    self.session = Some(previous);
                    self.state = ConnectionState::Ready;
                    return Ok(());
                }
                Ok(other) => {
                    let error = self.unexpected(other, "SessionActivated");
                    tracing::info!(
                        session_id = %previous.session_id,
                        error = %error,
                        "Session re-bind refused, creating a new session"
                    );
                }
                Err(e) if !e.is_retryable() => {
                    tracing::info!(
                        session_id = %previous.session_id,
                        error = %e,
                        "Session re-bind failed, creating a new session"
                    );
                }
                Err(e) => return Err(e),
            }
            self.state = ConnectionState::Connected;
            self.create_session().await?;
        }
        Ok(())
    }

    /// Closes the session and the channel and drops the transport.
    ///
    /// Always succeeds, in any state, any number of times.
    pub async fn disconnect(&mut self) {
        if self.state == ConnectionState::Disconnected && !self.transport.is_connected() {
            self.session = None;
            self.channel_id = None;
            self.backoff.reset();
            return;
        }

        if let Some(session) = self.session.take() {
            if self.transport.is_connected() {
                let close = Request::CloseSession {
                    session_id: session.session_id.clone(),
                };
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, self.transport.request(close)).await;
            }
        }
        self.drop_channel().await;
        self.backoff.reset();
        tracing::info!(endpoint = %self.options.endpoint_url, "Disconnected");
    }

    async fn drop_channel(&mut self) {
        if self.channel_id.take().is_some() && self.transport.is_connected() {
            let _ = tokio::time::timeout(
                CLOSE_TIMEOUT,
                self.transport.request(Request::CloseSecureChannel),
            )
            .await;
        }
        self.transport.close().await;
        self.state = ConnectionState::Disconnected;
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Creates and activates a session.
    pub async fn create_session(&mut self) -> UaResult<SessionId> {
        if !self.state.has_channel() {
            return Err(UaError::connection_failed(
                &self.options.endpoint_url,
                "not connected",
            ));
        }
        self.state = ConnectionState::SessionEstablishing;

        let request = Request::CreateSession {
            session_name: self.options.session_name.clone(),
            identity: self.options.identity.clone(),
            requested_timeout: self.options.session_timeout,
        };
        let response = match self.round_trip(request).await {
            Ok(response) => response,
            Err(e) => {
                if self.state.has_channel() {
                    self.state = ConnectionState::Connected;
                }
                return Err(e);
            }
        };

        match response {
            Response::SessionCreated {
                session_id,
                revised_timeout,
            } => {
                tracing::info!(
                    session_id = %session_id,
                    identity = %self.options.identity.label(),
                    timeout_ms = revised_timeout.as_millis() as u64,
                    "Session created"
                );
                self.session = Some(ActiveSession {
                    session_id: session_id.clone(),
                    revised_timeout,
                });
                self.state = ConnectionState::Ready;
                Ok(session_id)
            }
            other => {
                self.state = ConnectionState::Connected;
                Err(self.unexpected(other, "SessionCreated"))
            }
        }
    }

    /// Closes the active session. Closing with no session succeeds.
    pub async fn close_session(&mut self) -> UaResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.state = ConnectionState::Connected;

        let request = Request::CloseSession {
            session_id: session.session_id.clone(),
        };
        match self.round_trip(request).await? {
            Response::SessionClosed => {
                tracing::info!(session_id = %session.session_id, "Session closed");
                Ok(())
            }
            other => Err(self.unexpected(other, "SessionClosed")),
        }
    }

    /// Sends a session-scoped request built by `build`.
    ///
    /// A lost connection triggers one [`reconnect`](Self::reconnect) and a
    /// retry. A session fault clears the session and surfaces as
    /// `SessionExpired`.
    pub async fn session_request<F>(&mut self, build: F) -> UaResult<Response>
    where
        F: Fn(&SessionId) -> Request,
    {
        if self.session.is_some() && !self.state.has_channel() {
            self.reconnect().await?;
        }
        let session_id = self.require_session()?;

        let response = match self.round_trip(build(&session_id)).await {
            Ok(response) => response,
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "Connection lost during request");
                self.reconnect().await?;
                let session_id = self.require_session()?;
                self.round_trip(build(&session_id)).await?
            }
            Err(e) => return Err(e),
        };

        if let Some(status) = response.fault_status() {
            let error = self.fault_error(status);
            if error.requires_new_session() {
                tracing::info!(session_id = %session_id, status = %status, "Session no longer valid");
                self.session = None;
                self.state = ConnectionState::Connected;
            }
            return Err(error);
        }
        Ok(response)
    }

    fn require_session(&self) -> UaResult<SessionId> {
        match (&self.session, self.state) {
            (Some(session), ConnectionState::Ready) => Ok(session.session_id.clone()),
            (Some(session), _) => Err(UaError::session_expired(
                &session.session_id,
                StatusCode::BAD_SESSION_NOT_ACTIVATED,
            )),
            (None, _) => Err(UaError::session_expired(
                "none",
                StatusCode::BAD_SESSION_ID_INVALID,
            )),
        }
    }

    // =========================================================================
    // Round trips
    // =========================================================================

    /// Sends one request within `request_timeout`.
    ///
    /// On timeout or transport failure the transport is closed and the
    /// state falls back to `Disconnected`; the session record is kept so
    /// that a reconnect can re-bind it.
    pub async fn round_trip(&mut self, request: Request) -> UaResult<Response> {
        let service = request.service_name();
        let timeout = self.options.request_timeout;
        let result = match tokio::time::timeout(timeout, self.transport.request(request)).await {
            Ok(result) => result,
            Err(_) => Err(UaError::Timeout(timeout)),
        };

        match result {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::debug!(service, error = %e, "Round trip failed");
                if e.is_retryable() || matches!(e, UaError::Protocol(_)) {
                    self.transport.close().await;
                    self.channel_id = None;
                    self.state = ConnectionState::Disconnected;
                }
                Err(e)
            }
        }
    }

    fn unexpected(&self, response: Response, expected: &str) -> UaError {
        match response.fault_status() {
            Some(status) => self.fault_error(status),
            None => UaError::protocol(format!("expected {}, got {:?}", expected, response)),
        }
    }

    /// Like [`Self::unexpected`], but a server that is not running yields
    /// `EndpointsNotKnown`.
    fn handshake_error(&self, response: Response, expected: &str) -> UaError {
        match response.fault_status() {
            Some(StatusCode::BAD_SERVER_NOT_CONNECTED | StatusCode::BAD_SERVER_HALTED) => {
                UaError::EndpointsNotKnown {
                    endpoint: self.options.endpoint_url.clone(),
                }
            }
            _ => self.unexpected(response, expected),
        }
    }

    /// Maps a service fault onto the error taxonomy.
    pub(crate) fn fault_error(&self, status: StatusCode) -> UaError {
        match status.kind() {
            Some(ErrorKind::SessionExpired) => {
                let session = self
                    .session
                    .as_ref()
                    .map(|s| s.session_id.to_string())
                    .unwrap_or_else(|| "none".to_string());
                UaError::session_expired(session, status)
            }
            Some(ErrorKind::ConnectionFailed) => {
                UaError::from_status(status, self.options.endpoint_url.clone())
            }
            _ => UaError::from_status(status, status.name()),
        }
    }

    /// Lists the server endpoints. The channel must be open.
    ///
    /// An empty list or a halted server yields `EndpointsNotKnown`.
    pub async fn get_endpoints(&mut self) -> UaResult<Vec<EndpointDescription>> {
        if !self.state.has_channel() {
            return Err(UaError::connection_failed(
                &self.options.endpoint_url,
                "not connected",
            ));
        }
        let endpoint = self.options.endpoint_url.clone();
        match self.round_trip(Request::GetEndpoints).await? {
            Response::Endpoints { endpoints } if endpoints.is_empty() => {
                Err(UaError::EndpointsNotKnown { endpoint })
            }
            Response::Endpoints { endpoints } => {
                for e in &endpoints {
                    tracing::info!(
                        url = %e.endpoint_url,
                        mode = %e.security_mode,
                        policy = %e.security_policy_uri,
                        "Server endpoint"
                    );
                }
                Ok(endpoints)
            }
            Response::ServiceFault { status }
                if status == StatusCode::BAD_SERVER_HALTED
                    || status == StatusCode::BAD_SERVER_NOT_CONNECTED =>
            {
                Err(UaError::EndpointsNotKnown { endpoint })
            }
            other => Err(self.unexpected(other, "Endpoints")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use parking_lot::Mutex;
    use uanode_core::types::NodeId;

    /// Replays canned responses and records requests.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        connected: bool,
        connect_failures: u32,
        replies: VecDeque<UaResult<Response>>,
        sent: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScriptedTransport {
        fn reply(mut self, response: Response) -> Self {
            self.replies.push_back(Ok(response));
            self
        }

        fn fail(mut self, error: UaError) -> Self {
            self.replies.push_back(Err(error));
            self
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&mut self, endpoint_url: &str) -> UaResult<()> {
            if self.connect_failures > 0 {
                self.connect_failures -= 1;
                return Err(UaError::connection_failed(endpoint_url, "refused"));
            }
            self.connected = true;
            Ok(())
        }

        async fn request(&mut self, request: Request) -> UaResult<Response> {
            self.sent.lock().push(request.service_name());
            match self.replies.pop_front() {
                Some(reply) => reply,
                None => Err(UaError::connection_failed("script", "no more replies")),
            }
        }

        async fn close(&mut self) {
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn ack() -> Response {
        Response::Acknowledge {
            server_uri: "urn:test".into(),
        }
    }

    fn opened() -> Response {
        Response::ChannelOpened {
            channel_id: 7,
            security: SecurityPair::none(),
        }
    }

    fn created(id: &str) -> Response {
        Response::SessionCreated {
            session_id: SessionId::from(id),
            revised_timeout: Duration::from_secs(60),
        }
    }

    fn options() -> ConnectionOptions {
        ConnectionOptions::new("opc.tcp://localhost:4334/UA/MyServer").with_strategy(
            ConnectionStrategy::new(3, Duration::from_secs(1), Duration::from_secs(10)),
        )
    }

    #[tokio::test]
    async fn test_connect_and_create_session() {
        let transport = ScriptedTransport::default()
            .reply(ack())
            .reply(opened())
            .reply(created("s-1"));
        let mut manager = ConnectionManager::new(Box::new(transport), options());

        manager.connect().await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.channel_id(), Some(7));

        let id = manager.create_session().await.unwrap();
        assert_eq!(id.as_str(), "s-1");
        assert!(manager.state().is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_gives_up_after_max_retry() {
        let transport = ScriptedTransport {
            connect_failures: u32::MAX,
            ..Default::default()
        };
        let mut manager = ConnectionManager::new(Box::new(transport), options());

        let started = tokio::time::Instant::now();
        let err = manager.connect().await.unwrap_err();
        match err {
            UaError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
        // Two sleeps between three attempts: 1s then 2s.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.stats().connect_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_recovers_after_failures() {
        let transport = ScriptedTransport {
            connect_failures: 2,
            ..Default::default()
        }
        .reply(ack())
        .reply(opened());
        let mut manager = ConnectionManager::new(Box::new(transport), options());

        manager.connect().await.unwrap();
        assert_eq!(manager.stats().connect_attempts, 3);
    }

    #[tokio::test]
    async fn test_security_rejection_is_terminal() {
        let transport = ScriptedTransport::default()
            .reply(ack())
            .reply(Response::fault(StatusCode::BAD_SECURITY_MODE_REJECTED));
        let mut manager = ConnectionManager::new(Box::new(transport), options());

        let err = manager.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityRejected);
        assert_eq!(manager.stats().connect_attempts, 1);
    }

    #[tokio::test]
    async fn test_empty_endpoint_list() {
        let transport = ScriptedTransport::default()
            .reply(ack())
            .reply(opened())
            .reply(Response::Endpoints { endpoints: vec![] });
        let mut manager = ConnectionManager::new(Box::new(transport), options());
        manager.connect().await.unwrap();

        let err = manager.get_endpoints().await.unwrap_err();
        assert!(matches!(err, UaError::EndpointsNotKnown { .. }));
        assert!(err.recovery_hint().unwrap().contains("not be fully initialized"));
    }

    #[tokio::test]
    async fn test_session_fault_clears_session() {
        let transport = ScriptedTransport::default()
            .reply(ack())
            .reply(opened())
            .reply(created("s-1"))
            .reply(Response::fault(StatusCode::BAD_SESSION_CLOSED));
        let mut manager = ConnectionManager::new(Box::new(transport), options());
        manager.connect().await.unwrap();
        manager.create_session().await.unwrap();

        let err = manager
            .session_request(|id| Request::Browse {
                session_id: id.clone(),
                node_id: NodeId::objects_folder(),
            })
            .await
            .unwrap_err();
        assert!(err.requires_new_session());
        assert!(manager.session().is_none());
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_connection_rebinds_session() {
        let transport = ScriptedTransport::default()
            .reply(ack())
            .reply(opened())
            .reply(created("s-1"))
            .fail(UaError::connection_failed("x", "reset"))
            .reply(ack())
            .reply(opened())
            .reply(Response::SessionActivated {
                session_id: SessionId::from("s-1"),
            })
            .reply(Response::BrowseResults { references: vec![] });
        let sent = transport.sent.clone();
        let mut manager = ConnectionManager::new(Box::new(transport), options());
        manager.connect().await.unwrap();
        manager.create_session().await.unwrap();

        let response = manager
            .session_request(|id| Request::Browse {
                session_id: id.clone(),
                node_id: NodeId::objects_folder(),
            })
            .await
            .unwrap();
        assert!(matches!(response, Response::BrowseResults { .. }));
        assert_eq!(manager.session().unwrap().session_id.as_str(), "s-1");
        assert_eq!(manager.stats().reconnects, 1);
        assert!(sent.lock().contains(&"ActivateSession"));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let transport = ScriptedTransport::default().reply(ack()).reply(opened());
        let mut manager = ConnectionManager::new(Box::new(transport), options());
        manager.connect().await.unwrap();

        manager.disconnect().await;
        manager.disconnect().await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.channel_id().is_none());
    }
}
