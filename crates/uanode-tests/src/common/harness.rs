// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! A started server with its background tasks, reachable either through
//! [`LoopbackTransport`] or over a real TCP socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uanode_client::{ConnectionOptions, UaClient};
use uanode_config::UaNodeConfig;
use uanode_core::address_space::HostInfo;
use uanode_server::security::CertificateStore;
use uanode_server::UaServer;

use super::fixtures::{ClientFixtures, HostFixtures};
use super::mocks::{LoopbackControl, LoopbackTransport};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// TestServer
// =============================================================================

/// Builder options of a [`TestServer`].
#[derive(Default)]
pub struct TestServerOptions {
    /// Certificate store. Defaults to the server's in-memory store.
    pub certificate_store: Option<Arc<dyn CertificateStore>>,
    /// Host information. Defaults to [`HostFixtures::host_info`].
    pub host_info: Option<Arc<dyn HostInfo>>,
    /// Start the session sweep and simulator.
    pub background_tasks: bool,
}

/// A running in-process server.
pub struct TestServer {
    server: UaServer,
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl TestServer {
    /// Builds and starts a server with background tasks.
    pub fn start(config: UaNodeConfig) -> Self {
        Self::start_with(
            config,
            TestServerOptions {
                background_tasks: true,
                ..Default::default()
            },
        )
    }

    /// Builds and starts a server.
    pub fn start_with(config: UaNodeConfig, options: TestServerOptions) -> Self {
        super::init_test_logging();

        let host = options
            .host_info
            .unwrap_or_else(|| HostFixtures::host_info() as Arc<dyn HostInfo>);
        let mut builder = UaServer::builder(Arc::new(config)).host_info(host);
        if let Some(store) = options.certificate_store {
            builder = builder.certificate_store(store);
        }
        let server = builder.build().expect("Failed to build test server");
        server.start();

        let (shutdown, _) = broadcast::channel(1);
        let tasks = if options.background_tasks {
            server.spawn_background_tasks(&shutdown)
        } else {
            Vec::new()
        };
        Self {
            server,
            shutdown,
            tasks,
        }
    }

    /// The server.
    pub fn server(&self) -> &UaServer {
        &self.server
    }

    /// A loopback transport into this server.
    pub fn loopback(&self) -> (LoopbackTransport, LoopbackControl) {
        LoopbackTransport::new(self.server.clone())
    }

    /// A client with [`ClientFixtures::options`].
    pub fn client(&self) -> UaClient {
        self.client_with(ClientFixtures::options(self.server.endpoint_url()))
    }

    /// A client with custom options.
    pub fn client_with(&self, options: ConnectionOptions) -> UaClient {
        let (transport, _) = self.loopback();
        UaClient::new(Box::new(transport), options)
    }

    /// Like [`client`](Self::client), also returning the transport control.
    pub fn controlled_client(&self) -> (UaClient, LoopbackControl) {
        let (transport, control) = self.loopback();
        let options = ClientFixtures::options(self.server.endpoint_url());
        (UaClient::new(Box::new(transport), options), control)
    }

    /// Halts the server and waits for the background tasks.
    ///
    /// Returns the number of sessions closed.
    pub async fn stop(self) -> usize {
        let _ = self.shutdown.send(());
        let closed = self.server.shutdown();
        let _ = tokio::time::timeout(STOP_TIMEOUT, futures::future::join_all(self.tasks)).await;
        closed
    }
}

// =============================================================================
// TcpTestServer
// =============================================================================

/// A server listening on an ephemeral loopback port.
pub struct TcpTestServer {
    inner: TestServer,
    serving: JoinHandle<()>,
}

impl TcpTestServer {
    /// Binds `127.0.0.1:0`, rewrites the port into `config` and serves.
    pub async fn start(mut config: UaNodeConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener
            .local_addr()
            .expect("Listener has no local address")
            .port();
        config.server.port = port;
        config.server.hostname_in_url = "127.0.0.1".to_string();

        let inner = TestServer::start(config);
        let server = inner.server.clone();
        let shutdown = inner.shutdown.subscribe();
        let serving = tokio::spawn(async move {
            if let Err(e) = server.serve(listener, shutdown).await {
                tracing::error!(error = %e, "Test listener failed");
            }
        });
        Self { inner, serving }
    }

    /// The endpoint URL clients should dial.
    pub fn endpoint_url(&self) -> String {
        self.inner.server.endpoint_url()
    }

    /// The server.
    pub fn server(&self) -> &UaServer {
        &self.inner.server
    }

    /// A TCP client with [`ClientFixtures::options`].
    pub fn client(&self) -> UaClient {
        UaClient::tcp(ClientFixtures::options(self.endpoint_url()))
    }

    /// Stops the listener and the server.
    pub async fn stop(self) -> usize {
        let closed = self.inner.stop().await;
        let _ = tokio::time::timeout(STOP_TIMEOUT, self.serving).await;
        closed
    }
}
