// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! Startup order:
//!
//! 1. PKI directories (and the application certificate when an advertised
//!    endpoint signs)
//! 2. certificate store and address space
//! 3. listener bind
//! 4. endpoint publication, session sweep and value simulator
//!
//! Shutdown stops the listener, closes every session and waits for the
//! background tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uanode_config::UaNodeConfig;
use uanode_core::address_space::HostInfo;
use uanode_server::security::{init_pki, CertificateStore, CertificateSubject, FileSystemStore, PkiLayout};
use uanode_server::UaServer;

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// Bound on waiting for the listener and background tasks at shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// ServerRuntime
// =============================================================================

/// Runs the server until shutdown is signaled.
pub struct ServerRuntime {
    config: Arc<UaNodeConfig>,
    shutdown: ShutdownCoordinator,
    host_info: Option<Arc<dyn HostInfo>>,
    listener: Option<TcpListener>,
}

impl ServerRuntime {
    /// Creates a runtime for `config`.
    pub fn new(config: Arc<UaNodeConfig>) -> Self {
        Self {
            config,
            shutdown: ShutdownCoordinator::new(),
            host_info: None,
            listener: None,
        }
    }

    /// Uses `coordinator` instead of a private one.
    pub fn with_shutdown(mut self, coordinator: ShutdownCoordinator) -> Self {
        self.shutdown = coordinator;
        self
    }

    /// Overrides the host information source.
    pub fn with_host_info(mut self, host: Arc<dyn HostInfo>) -> Self {
        self.host_info = Some(host);
        self
    }

    /// Serves on an already bound listener instead of binding the
    /// configured address.
    pub fn with_listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Runs until SIGINT/SIGTERM or a programmatic shutdown.
    pub async fn run(self) -> BinResult<()> {
        info!(version = uanode_core::VERSION, "Starting uanode server");

        let server = self.initialize().await?;
        let listener = match self.listener {
            Some(listener) => listener,
            None => server.bind().await?,
        };

        server.start();
        let tasks = server.spawn_background_tasks(self.shutdown.sender());
        let serving = {
            let server = server.clone();
            let shutdown = self.shutdown.subscribe();
            tokio::spawn(async move { server.serve(listener, shutdown).await })
        };

        info!(endpoint = %server.endpoint_url(), "Server is ready");
        self.shutdown.wait_for_shutdown().await;

        info!("Shutdown initiated, cleaning up...");
        let closed = server.shutdown();

        match tokio::time::timeout(DRAIN_TIMEOUT, serving).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "Listener stopped with an error"),
            Ok(Err(e)) => warn!(error = %e, "Listener task failed"),
            Err(_) => warn!("Listener did not stop in time"),
        }
        if tokio::time::timeout(DRAIN_TIMEOUT, futures::future::join_all(tasks))
            .await
            .is_err()
        {
            warn!("Background tasks did not stop in time");
        }

        let stats = server.session_stats();
        info!(
            sessions_closed = closed,
            sessions_created = stats.created,
            sessions_timed_out = stats.timed_out,
            "uanode server shutdown complete"
        );
        Ok(())
    }

    async fn initialize(&self) -> BinResult<UaServer> {
        let security = &self.config.security;
        let pki_context = || format!("Failed to prepare PKI directory {}", security.pki_dir.display());
        if security.requires_pki() {
            let report = init_pki(&security.pki_dir, &certificate_subject(&self.config))
                .await
                .with_context(pki_context)?;
            info!(
                pki_dir = %security.pki_dir.display(),
                thumbprint = %report.thumbprint,
                "Application certificate ready"
            );
        } else {
            PkiLayout::new(&security.pki_dir)
                .ensure()
                .await
                .with_context(pki_context)?;
        }

        let store = FileSystemStore::new(&security.pki_dir);
        store
            .initialize()
            .await
            .with_context(|| "Failed to load the certificate store")?;
        let store: Arc<dyn CertificateStore> = Arc::new(store);
        let mut builder = UaServer::builder(Arc::clone(&self.config)).certificate_store(store);
        if let Some(host) = &self.host_info {
            builder = builder.host_info(Arc::clone(host));
        }
        builder
            .build()
            .map_err(|e| BinError::from(e).with_context("Failed to build server"))
    }
}

/// Subject of the application certificate for `config`.
pub fn certificate_subject(config: &UaNodeConfig) -> CertificateSubject {
    let mut hostnames = vec![config.server.hostname_in_url.clone()];
    if config.server.hostname_in_url != "localhost" {
        hostnames.push("localhost".to_string());
    }
    CertificateSubject {
        common_name: config.server.application_name.clone(),
        application_uri: config.server.application_uri.clone(),
        hostnames,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uanode_core::address_space::{FixedHostInfo, HostSnapshot};

    fn test_config(dir: &TempDir) -> UaNodeConfig {
        let mut config = UaNodeConfig::default();
        config.server.host = "127.0.0.1".into();
        config.security.pki_dir = dir.path().join("pki");
        config.variables.simulation_enabled = false;
        config
    }

    #[test]
    fn test_certificate_subject() {
        let mut config = UaNodeConfig::default();
        config.server.hostname_in_url = "plc-01".into();
        let subject = certificate_subject(&config);
        assert_eq!(subject.hostnames, vec!["plc-01", "localhost"]);
        assert_eq!(subject.application_uri, config.server.application_uri);
    }

    #[tokio::test]
    async fn test_runtime_starts_and_stops() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(test_config(&dir));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let runtime = ServerRuntime::new(config)
            .with_listener(listener)
            .with_host_info(Arc::new(FixedHostInfo::new(HostSnapshot {
                hostname: "test-host".into(),
                process_uptime: Duration::from_secs(1),
                load_average_1m: 0.1,
            })));
        let coordinator = runtime.shutdown_coordinator().clone();
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(dir.path().join("pki").join("trusted").is_dir());

        coordinator.initiate_shutdown();
        tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_runtime_fails_on_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.server.port = 0;

        let err = ServerRuntime::new(Arc::new(config)).run().await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
