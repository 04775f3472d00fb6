// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Session Lifecycle Integration Tests
//!
//! Idle expiry through the background sweep, activity keeping a session
//! alive, and shutdown closing every session. Time is paused; the sweep
//! runs on the virtual clock.

use std::time::Duration;

use uanode_client::ConnectionState;
use uanode_core::DeviceNodes;
use uanode_core::{ErrorKind, StatusCode, UaError, Variant};
use uanode_server::{CloseReason, ServerState};
use uanode_tests::prelude::*;

// =============================================================================
// Idle Expiry Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_session_expires_after_idle_timeout() {
    let harness = TestServer::start(ConfigFixtures::server());
    let nodes = DeviceNodes::default();
    let mut client = harness.client();
    client.connect().await.unwrap();
    let session_id = client.create_session().await.unwrap();

    let info = harness.server().sessions().session(&session_id).unwrap();
    assert_eq!(info.timeout, Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(12)).await;

    assert!(harness.server().sessions().session(&session_id).is_none());
    assert_eq!(harness.server().session_stats().timed_out, 1);
    assert_eq!(
        harness.server().sessions().close_reason(&session_id),
        Some(CloseReason::TimedOut)
    );

    let err = client.read_values(&[nodes.temperature.clone()]).await.unwrap_err();
    assert!(matches!(err, UaError::SessionExpired { .. }));
    assert_eq!(err.kind(), ErrorKind::SessionExpired);
    assert_eq!(err.status(), Some(StatusCode::BAD_SESSION_CLOSED));
    assert!(client.session_id().is_none());
    assert_eq!(client.state(), ConnectionState::Connected);

    // A fresh session works on the same channel.
    client.create_session().await.unwrap();
    let values = client.read_values(&[nodes.temperature.clone()]).await.unwrap();
    assert_eq!(values[0].value, Some(Variant::Double(25.0)));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_session_activity_resets_idle_timer() {
    let harness = TestServer::start(ConfigFixtures::server());
    let nodes = DeviceNodes::default();
    let mut client = harness.client();
    client.connect().await.unwrap();
    client.create_session().await.unwrap();

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        client.read_values(&[nodes.humidity.clone()]).await.unwrap();
    }

    assert_eq!(harness.server().session_stats().timed_out, 0);
    assert_eq!(harness.server().sessions().len(), 1);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_session_shorter_client_timeout_wins() {
    let harness = TestServer::start(ConfigFixtures::server());
    let url = harness.server().endpoint_url();
    let mut client =
        harness.client_with(ClientFixtures::options(url).with_session_timeout(Duration::from_secs(3)));
    client.connect().await.unwrap();
    let session_id = client.create_session().await.unwrap();

    let info = harness.server().sessions().session(&session_id).unwrap();
    assert_eq!(info.timeout, Duration::from_secs(3));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.server().session_stats().timed_out, 1);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_detached_session_survives_until_swept() {
    let harness = TestServer::start(ConfigFixtures::server());
    let mut client = harness.client();
    client.connect().await.unwrap();
    let session_id = client.create_session().await.unwrap();

    // Dropping the client drops its server connection.
    drop(client);
    let info = harness.server().sessions().session(&session_id).unwrap();
    assert!(info.channel_id.is_none());

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(harness.server().sessions().session(&session_id).is_none());
    assert_eq!(harness.server().session_stats().timed_out, 1);
    harness.stop().await;
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[tokio::test]
async fn test_shutdown_closes_every_session() {
    let harness = TestServer::start(ConfigFixtures::server());
    let nodes = DeviceNodes::default();

    let mut first = harness.client();
    first.connect().await.unwrap();
    first.create_session().await.unwrap();
    let mut second = harness.client();
    second.connect().await.unwrap();
    second.create_session().await.unwrap();

    let server = harness.server().clone();
    assert_eq!(harness.stop().await, 2);
    assert_eq!(server.state(), ServerState::Halted);
    assert!(server.sessions().is_empty());
    assert_eq!(server.session_stats().closed, 2);

    let err = first.read_values(&[nodes.temperature.clone()]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
}

#[tokio::test]
async fn test_close_session_is_recorded() {
    let harness = TestServer::start(ConfigFixtures::server());
    let mut client = harness.client();
    client.connect().await.unwrap();
    let session_id = client.create_session().await.unwrap();

    client.close_session().await.unwrap();
    client.close_session().await.unwrap();

    assert_eq!(
        harness.server().sessions().close_reason(&session_id),
        Some(CloseReason::Requested)
    );
    assert_eq!(harness.server().session_stats().closed, 1);
    assert_eq!(client.state(), ConnectionState::Connected);
    harness.stop().await;
}
