// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Security Integration Tests
//!
//! Mode and policy negotiation, certificate trust and PKI initialization.
//!
//! ## Test Categories
//!
//! - `test_negotiation_*`: advertised pair matching
//! - `test_certificate_*`: trust decisions on signing channels
//! - `test_pki_*`: application certificate generation

use std::sync::Arc;

use chrono::Utc;
use uanode_client::ConnectionState;
use uanode_core::DeviceNodes;
use uanode_core::types::{SecurityMode, SecurityPair, SecurityPolicy};
use uanode_core::{ErrorKind, StatusCode, UaError, Variant};
use uanode_server::security::{
    init_pki, thumbprint, CertificateStore, CertificateSubject, FileSystemStore, MemoryStore,
    TrustStatus,
};
use uanode_tests::prelude::*;

const CLIENT_DER: &[u8] = b"uanode-test-client-certificate";

fn secured_server(store: Arc<dyn CertificateStore>, reject_unauthorized: bool) -> (TestServer, tempfile::TempDir) {
    let pki = temp_test_dir("uanode-security");
    let harness = TestServer::start_with(
        ConfigFixtures::secured(pki.path(), reject_unauthorized),
        TestServerOptions {
            certificate_store: Some(store),
            ..Default::default()
        },
    );
    (harness, pki)
}

fn subject() -> CertificateSubject {
    CertificateSubject {
        common_name: "uanode test".to_string(),
        application_uri: "urn:localhost:uanode:test".to_string(),
        hostnames: vec!["localhost".to_string()],
    }
}

// =============================================================================
// Negotiation Tests
// =============================================================================

#[tokio::test]
async fn test_negotiation_unadvertised_pair_is_terminal() {
    let harness = TestServer::start(ConfigFixtures::server());
    let (transport, control) = harness.loopback();
    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(ConfigFixtures::secure_pair())
        .with_certificate(CertificateFixtures::valid(CLIENT_DER));
    let mut client = uanode_client::UaClient::new(Box::new(transport), options);

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecurityRejected);
    assert_eq!(err.status(), Some(StatusCode::BAD_SECURITY_POLICY_REJECTED));
    assert!(!err.is_retryable());
    assert_eq!(control.connects(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    harness.stop().await;
}

#[tokio::test]
async fn test_negotiation_mode_and_policy_must_both_match() {
    let store: Arc<dyn CertificateStore> = Arc::new(MemoryStore::new());
    let (harness, _pki) = secured_server(store, false);

    // Advertised policy with a different mode.
    let pair = SecurityPair::new(SecurityMode::Sign, SecurityPolicy::Basic256Sha256);
    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(pair)
        .with_certificate(CertificateFixtures::valid(CLIENT_DER));
    let mut client = harness.client_with(options);

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, UaError::SecurityRejected { .. }));

    harness.stop().await;
}

#[tokio::test]
async fn test_negotiation_unsecured_pair_still_offered() {
    let store: Arc<dyn CertificateStore> = Arc::new(MemoryStore::new());
    let (harness, _pki) = secured_server(store, true);

    let mut client = harness.client();
    client.connect().await.unwrap();
    client.create_session().await.unwrap();
    harness.stop().await;
}

// =============================================================================
// Certificate Tests
// =============================================================================

#[tokio::test]
async fn test_certificate_trusted_opens_signed_channel() {
    let store = Arc::new(MemoryStore::new());
    store.add(CLIENT_DER, TrustStatus::Trusted).await.unwrap();
    let (harness, _pki) = secured_server(store, true);
    let nodes = DeviceNodes::default();

    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(ConfigFixtures::secure_pair())
        .with_certificate(CertificateFixtures::valid(CLIENT_DER));
    let mut client = harness.client_with(options);
    client.connect().await.unwrap();
    let session_id = client.create_session().await.unwrap();

    let info = harness.server().sessions().session(&session_id).unwrap();
    assert_eq!(info.security, ConfigFixtures::secure_pair());

    let values = client.read_values(&[nodes.temperature.clone()]).await.unwrap();
    assert_eq!(values[0].value, Some(Variant::Double(25.0)));
    harness.stop().await;
}

#[tokio::test]
async fn test_certificate_missing_is_rejected() {
    let store: Arc<dyn CertificateStore> = Arc::new(MemoryStore::new());
    let (harness, _pki) = secured_server(store, false);

    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(ConfigFixtures::secure_pair());
    let mut client = harness.client_with(options);

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_CERTIFICATE_INVALID));
    harness.stop().await;
}

#[tokio::test]
async fn test_certificate_expired_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    store.add(CLIENT_DER, TrustStatus::Trusted).await.unwrap();
    let (harness, _pki) = secured_server(store, false);

    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(ConfigFixtures::secure_pair())
        .with_certificate(CertificateFixtures::expired(CLIENT_DER));
    let mut client = harness.client_with(options);

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SecurityRejected);
    harness.stop().await;
}

#[tokio::test]
async fn test_certificate_unknown_auto_trusted_when_permissive() {
    let store = Arc::new(MemoryStore::new());
    let (harness, _pki) = secured_server(store.clone(), false);

    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(ConfigFixtures::secure_pair())
        .with_certificate(CertificateFixtures::valid(CLIENT_DER));
    let mut client = harness.client_with(options);
    client.connect().await.unwrap();

    assert_eq!(
        store.trust_status(&thumbprint(CLIENT_DER)).await.unwrap(),
        TrustStatus::Trusted
    );
    harness.stop().await;
}

#[tokio::test]
async fn test_certificate_unknown_filed_as_rejected_when_strict() {
    let store = Arc::new(MemoryStore::new());
    let (harness, _pki) = secured_server(store.clone(), true);

    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(ConfigFixtures::secure_pair())
        .with_certificate(CertificateFixtures::valid(CLIENT_DER));
    let mut client = harness.client_with(options);

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_CERTIFICATE_INVALID));
    assert_eq!(
        store.trust_status(&thumbprint(CLIENT_DER)).await.unwrap(),
        TrustStatus::Rejected
    );
    harness.stop().await;
}

// =============================================================================
// PKI Tests
// =============================================================================

#[tokio::test]
async fn test_pki_init_is_idempotent() {
    let dir = temp_test_dir("uanode-pki");
    let first = init_pki(dir.path(), &subject()).await.unwrap();
    assert!(first.generated);
    assert!(first.layout.certificate_path().is_file());
    assert!(first.layout.private_key_path().is_file());
    assert!(first.layout.trusted_dir().is_dir());
    assert!(first.layout.rejected_dir().is_dir());

    let second = init_pki(dir.path(), &subject()).await.unwrap();
    assert!(!second.generated);
    assert_eq!(second.thumbprint, first.thumbprint);
}

#[tokio::test]
async fn test_pki_own_certificate_opens_signed_channel() {
    let dir = temp_test_dir("uanode-pki-client");
    let report = init_pki(dir.path(), &subject()).await.unwrap();
    let own = report
        .layout
        .load_own_certificate("uanode test")
        .await
        .unwrap()
        .expect("certificate was generated");
    assert_eq!(thumbprint(&own.der), report.thumbprint);
    assert!(own.is_time_valid(Utc::now()));

    let store = Arc::new(FileSystemStore::new(dir.path()));
    store.initialize().await.unwrap();
    let harness = TestServer::start_with(
        ConfigFixtures::secured(dir.path(), false),
        TestServerOptions {
            certificate_store: Some(store.clone()),
            ..Default::default()
        },
    );

    let options = ClientFixtures::options(harness.server().endpoint_url())
        .with_security(ConfigFixtures::secure_pair())
        .with_certificate(own);
    let mut client = harness.client_with(options);
    client.connect().await.unwrap();
    client.create_session().await.unwrap();

    assert_eq!(
        store.trust_status(&report.thumbprint).await.unwrap(),
        TrustStatus::Trusted
    );
    assert!(report
        .layout
        .trusted_dir()
        .join(format!("{}.der", report.thumbprint))
        .is_file());
    harness.stop().await;
}
