// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Client Integration Tests
//!
//! Connection establishment, backoff, endpoint discovery and the
//! verification cycle.
//!
//! ## Test Categories
//!
//! - `test_retry_*`: exponential backoff against a refusing transport
//! - `test_endpoints_*`: endpoint discovery
//! - `test_session_*`: session creation, identity and re-bind
//! - `test_verification_*`: the full read-write-read cycle

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use uanode_bin::run_verification;
use uanode_client::{ConnectionOptions, ConnectionState, UaClient};
use uanode_core::address_space::HostInfo;
use uanode_core::retry::ConnectionStrategy;
use uanode_core::DeviceNodes;
use uanode_core::{ErrorKind, StatusCode, UaError, Variant};
use uanode_server::UaServer;
use uanode_tests::prelude::*;

// =============================================================================
// Retry Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_retry_stops_after_max_attempts() {
    init_test_logging();
    let (transport, log) = FailingTransport::new();
    let options = ConnectionOptions::new("opc.tcp://unreachable:4334/UA/MyServer").with_strategy(
        ConnectionStrategy::new(3, Duration::from_secs(1), Duration::from_secs(5)),
    );
    let mut client = UaClient::new(Box::new(transport), options);

    let started = Instant::now();
    let err = client.connect().await.unwrap_err();

    match &err {
        UaError::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    assert_eq!(log.count(), 3);
    assert_eq!(log.delays(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.stats().connect_attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_delays_are_capped() {
    let (transport, log) = FailingTransport::new();
    let options = ConnectionOptions::new("opc.tcp://unreachable:4334").with_strategy(
        ConnectionStrategy::new(6, Duration::from_secs(1), Duration::from_secs(5)),
    );
    let mut client = UaClient::new(Box::new(transport), options);

    assert!(client.connect().await.is_err());

    let delays = log.delays();
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(5),
            Duration::from_secs(5),
        ]
    );
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test(start_paused = true)]
async fn test_retry_single_attempt_has_no_delay() {
    let (transport, log) = FailingTransport::new();
    let options =
        ConnectionOptions::new("opc.tcp://unreachable:4334").with_strategy(ConnectionStrategy::no_retry());
    let mut client = UaClient::new(Box::new(transport), options);

    let started = Instant::now();
    assert!(client.connect().await.is_err());
    assert_eq!(log.count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

// =============================================================================
// Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_endpoints_list_advertised_pairs() {
    let pki = temp_test_dir("uanode-endpoints");
    let harness = TestServer::start(ConfigFixtures::secured(pki.path(), false));
    let mut client = harness.client();
    client.connect().await.unwrap();

    let endpoints = client.get_endpoints().await.unwrap();
    let pairs: Vec<_> = endpoints.iter().filter_map(|e| e.security_pair()).collect();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.contains(&ConfigFixtures::secure_pair()));
    assert!(endpoints
        .iter()
        .all(|e| e.endpoint_url == harness.server().endpoint_url()));

    harness.stop().await;
}

#[tokio::test]
async fn test_endpoints_unknown_after_server_halt() {
    let harness = TestServer::start(ConfigFixtures::server());
    let mut client = harness.client();
    client.connect().await.unwrap();

    harness.server().shutdown();
    let err = client.get_endpoints().await.unwrap_err();
    assert!(matches!(err, UaError::EndpointsNotKnown { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_endpoints_unknown_when_server_not_started() {
    init_test_logging();
    let server = UaServer::builder(Arc::new(ConfigFixtures::server()))
        .host_info(HostFixtures::host_info() as Arc<dyn HostInfo>)
        .build()
        .unwrap();
    let url = server.endpoint_url();
    let (transport, control) = LoopbackTransport::new(server);
    let mut client = UaClient::new(Box::new(transport), ClientFixtures::options(url));

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, UaError::EndpointsNotKnown { .. }), "got {:?}", err);
    assert!(err
        .recovery_hint()
        .unwrap()
        .starts_with("Server may not be fully initialized"));
    assert_eq!(control.connects(), 3);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_endpoints_unknown_when_connecting_to_halted_server() {
    let harness = TestServer::start(ConfigFixtures::server());
    harness.server().shutdown();
    let mut client = harness.client();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, UaError::EndpointsNotKnown { .. }), "got {:?}", err);
    assert_eq!(client.stats().connect_attempts, 3);
    harness.stop().await;
}

// =============================================================================
// Session Tests
// =============================================================================

#[tokio::test]
async fn test_session_anonymous_rejected_when_disabled() {
    let harness = TestServer::start(ConfigFixtures::with_users());
    let mut client = harness.client();
    client.connect().await.unwrap();

    let err = client.create_session().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    assert_eq!(err.status(), Some(StatusCode::BAD_IDENTITY_TOKEN_INVALID));
    assert!(client.session_id().is_none());

    let url = harness.server().endpoint_url();
    let mut wrong = harness.client_with(ClientFixtures::user_options(&url, "operator", "nope"));
    wrong.connect().await.unwrap();
    let err = wrong.create_session().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_IDENTITY_TOKEN_REJECTED));

    assert_eq!(harness.server().session_stats().created, 0);
    harness.stop().await;
}

#[tokio::test]
async fn test_session_rebinds_after_connection_loss() {
    let harness = TestServer::start(ConfigFixtures::server());
    let nodes = DeviceNodes::default();
    let (mut client, control) = harness.controlled_client();

    client.connect().await.unwrap();
    let session_id = client.create_session().await.unwrap();

    control.sever();
    let values = client.read_values(&[nodes.temperature.clone()]).await.unwrap();
    assert_eq!(values[0].value, Some(Variant::Double(25.0)));

    assert_eq!(client.session_id(), Some(&session_id));
    assert_eq!(client.state(), ConnectionState::Ready);
    assert_eq!(control.connects(), 2);
    assert_eq!(client.stats().reconnects, 1);
    assert_eq!(harness.server().session_stats().created, 1);

    harness.stop().await;
}

#[tokio::test]
async fn test_session_limit_enforced() {
    let mut config = ConfigFixtures::server();
    config.server.max_sessions = 1;
    let harness = TestServer::start(config);

    let mut first = harness.client();
    first.connect().await.unwrap();
    first.create_session().await.unwrap();

    let mut second = harness.client();
    second.connect().await.unwrap();
    let err = second.create_session().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_TOO_MANY_SESSIONS));

    first.close_session().await.unwrap();
    second.create_session().await.unwrap();

    harness.stop().await;
}

// =============================================================================
// Verification Cycle Tests
// =============================================================================

#[tokio::test]
async fn test_verification_cycle_over_loopback() {
    let harness = TestServer::start(ConfigFixtures::server());
    let mut client = harness.client();

    let report = run_verification(&mut client, Duration::ZERO).await.unwrap();

    assert_eq!(report.endpoints, 1);
    assert_eq!(report.initial.len(), 5);
    assert_eq!(report.write_statuses, vec![StatusCode::GOOD, StatusCode::GOOD]);
    assert_eq!(report.after_write[0].value, Some(Variant::Double(25.0)));
    assert_eq!(report.after_write[1].value, Some(Variant::Double(60.0)));
    assert!(report.after_write.iter().all(|v| v.is_good()));

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(harness.server().sessions().is_empty());
    assert_eq!(harness.server().session_stats().created, 1);

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_verification_disconnects_on_failure() {
    let (transport, log) = FailingTransport::new();
    let options = ConnectionOptions::new("opc.tcp://unreachable:4334")
        .with_strategy(ClientFixtures::fast_strategy());
    let mut client = UaClient::new(Box::new(transport), options);

    let err = run_verification(&mut client, Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, UaError::RetriesExhausted { .. }));
    assert!(err.recovery_hint().is_some());
    assert_eq!(log.count(), 3);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
