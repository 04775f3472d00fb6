// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built configurations, host snapshots, certificates and client
//! options. Every fixture binds loopback addresses and disables the value
//! simulator so that reads are deterministic.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uanode_client::ConnectionOptions;
use uanode_config::{UaNodeConfig, UserAccount};
use uanode_core::address_space::{FixedHostInfo, HostSnapshot};
use uanode_core::protocol::PeerCertificate;
use uanode_core::retry::ConnectionStrategy;
use uanode_core::types::{SecurityMode, SecurityPair, SecurityPolicy, UserIdentity};

// =============================================================================
// Configuration Fixtures
// =============================================================================

/// Pre-built server configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Unsecured anonymous server with a 10 second session timeout.
    pub fn server() -> UaNodeConfig {
        let mut config = UaNodeConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.hostname_in_url = "127.0.0.1".to_string();
        config.server.session_timeout = Duration::from_secs(10);
        config.server.sweep_interval = Duration::from_secs(1);
        config.variables.simulation_enabled = false;
        config
    }

    /// Advertises `None/None` and `SignAndEncrypt/Basic256Sha256`.
    pub fn secured(pki_dir: &Path, reject_unauthorized: bool) -> UaNodeConfig {
        let mut config = Self::server();
        config.security.endpoints = vec![SecurityPair::none(), Self::secure_pair()];
        config.security.pki_dir = pki_dir.to_path_buf();
        config.security.reject_unauthorized = reject_unauthorized;
        config
    }

    /// Anonymous access disabled, one `operator` account.
    pub fn with_users() -> UaNodeConfig {
        let mut config = Self::server();
        config.security.allow_anonymous = false;
        config.security.users = vec![UserAccount {
            username: "operator".to_string(),
            password: "secret".to_string(),
        }];
        config
    }

    /// The signing pair of [`secured`](Self::secured).
    pub fn secure_pair() -> SecurityPair {
        SecurityPair::new(SecurityMode::SignAndEncrypt, SecurityPolicy::Basic256Sha256)
    }
}

// =============================================================================
// Host Fixtures
// =============================================================================

/// Fixed host snapshots for the computed variables.
pub struct HostFixtures;

impl HostFixtures {
    /// Host name reported by [`host_info`](Self::host_info).
    pub const HOSTNAME: &'static str = "test-host";

    /// Uptime reported by [`host_info`](Self::host_info), in seconds.
    pub const UPTIME_SECS: u64 = 3600;

    /// Load average reported by [`host_info`](Self::host_info).
    pub const LOAD_AVERAGE: f64 = 0.5;

    /// The fixed snapshot.
    pub fn snapshot() -> HostSnapshot {
        HostSnapshot {
            hostname: Self::HOSTNAME.to_string(),
            process_uptime: Duration::from_secs(Self::UPTIME_SECS),
            load_average_1m: Self::LOAD_AVERAGE,
        }
    }

    /// A provider that always returns [`snapshot`](Self::snapshot).
    pub fn host_info() -> Arc<FixedHostInfo> {
        Arc::new(FixedHostInfo::new(Self::snapshot()))
    }
}

// =============================================================================
// Certificate Fixtures
// =============================================================================

/// Client certificates with controlled validity windows.
pub struct CertificateFixtures;

impl CertificateFixtures {
    /// Valid from yesterday until next month.
    pub fn valid(der: &[u8]) -> PeerCertificate {
        let now = Utc::now();
        PeerCertificate {
            der: der.to_vec(),
            subject: "CN=uanode test client".to_string(),
            not_before: now - chrono::Duration::days(1),
            not_after: now + chrono::Duration::days(30),
        }
    }

    /// Expired yesterday.
    pub fn expired(der: &[u8]) -> PeerCertificate {
        let now = Utc::now();
        PeerCertificate {
            der: der.to_vec(),
            subject: "CN=uanode expired client".to_string(),
            not_before: now - chrono::Duration::days(400),
            not_after: now - chrono::Duration::days(1),
        }
    }
}

// =============================================================================
// Client Fixtures
// =============================================================================

/// Client connection options.
pub struct ClientFixtures;

impl ClientFixtures {
    /// Anonymous, unsecured, three attempts with short delays.
    pub fn options(endpoint_url: impl Into<String>) -> ConnectionOptions {
        ConnectionOptions::new(endpoint_url)
            .with_strategy(Self::fast_strategy())
            .with_request_timeout(Duration::from_secs(2))
    }

    /// Like [`options`](Self::options) but authenticating as `username`.
    pub fn user_options(
        endpoint_url: impl Into<String>,
        username: &str,
        password: &str,
    ) -> ConnectionOptions {
        Self::options(endpoint_url).with_identity(UserIdentity::user_name(username, password))
    }

    /// Three attempts, 10 ms initial delay, 40 ms cap.
    pub fn fast_strategy() -> ConnectionStrategy {
        ConnectionStrategy::new(3, Duration::from_millis(10), Duration::from_millis(40))
    }
}
