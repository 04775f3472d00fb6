// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Transports
//!
//! [`LoopbackTransport`] feeds requests straight into a server connection
//! in the same process. [`FailingTransport`] refuses every connection and
//! records when each attempt happened.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use uanode_client::Transport;
use uanode_core::error::{UaError, UaResult};
use uanode_core::protocol::{Request, Response};
use uanode_server::{ServerConnection, UaServer};

// =============================================================================
// LoopbackTransport
// =============================================================================

/// Handle for steering a [`LoopbackTransport`] from the test body.
#[derive(Debug, Clone, Default)]
pub struct LoopbackControl {
    connects: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
    sever_next: Arc<AtomicBool>,
}

impl LoopbackControl {
    /// Makes the next request fail as if the socket dropped.
    pub fn sever(&self) {
        self.sever_next.store(true, Ordering::SeqCst);
    }

    /// Number of connections opened so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of requests delivered to the server.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// In-process transport backed by [`UaServer::open_connection`].
#[derive(Debug)]
pub struct LoopbackTransport {
    server: UaServer,
    connection: Option<ServerConnection>,
    control: LoopbackControl,
}

impl LoopbackTransport {
    /// Creates a disconnected transport and its control handle.
    pub fn new(server: UaServer) -> (Self, LoopbackControl) {
        let control = LoopbackControl::default();
        let transport = Self {
            server,
            connection: None,
            control: control.clone(),
        };
        (transport, control)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(&mut self, _endpoint_url: &str) -> UaResult<()> {
        self.control.connects.fetch_add(1, Ordering::SeqCst);
        self.connection = Some(self.server.open_connection("loopback"));
        Ok(())
    }

    async fn request(&mut self, request: Request) -> UaResult<Response> {
        if self.control.sever_next.swap(false, Ordering::SeqCst) {
            self.connection = None;
            return Err(UaError::connection_failed("loopback", "connection reset by peer"));
        }
        let Some(connection) = self.connection.as_mut() else {
            return Err(UaError::connection_failed("loopback", "not connected"));
        };
        self.control.requests.fetch_add(1, Ordering::SeqCst);
        Ok(connection.handle(request).await)
    }

    async fn close(&mut self) {
        self.connection = None;
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

// =============================================================================
// FailingTransport
// =============================================================================

/// Timestamps of the connection attempts made through a [`FailingTransport`].
#[derive(Debug, Clone, Default)]
pub struct AttemptLog {
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl AttemptLog {
    /// Number of attempts.
    pub fn count(&self) -> usize {
        self.attempts.lock().len()
    }

    /// Attempt instants, in order.
    pub fn instants(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    /// Gaps between consecutive attempts.
    pub fn delays(&self) -> Vec<std::time::Duration> {
        self.instants()
            .windows(2)
            .map(|pair| pair[1].duration_since(pair[0]))
            .collect()
    }
}

/// A transport whose connection attempts are always refused.
#[derive(Debug, Default)]
pub struct FailingTransport {
    log: AttemptLog,
}

impl FailingTransport {
    /// Creates the transport and the log its attempts are written to.
    pub fn new() -> (Self, AttemptLog) {
        let log = AttemptLog::default();
        (Self { log: log.clone() }, log)
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn connect(&mut self, endpoint_url: &str) -> UaResult<()> {
        self.log.attempts.lock().push(Instant::now());
        Err(UaError::connection_failed(endpoint_url, "connection refused"))
    }

    async fn request(&mut self, _request: Request) -> UaResult<Response> {
        Err(UaError::connection_failed("failing", "not connected"))
    }

    async fn close(&mut self) {}

    fn is_connected(&self) -> bool {
        false
    }
}
