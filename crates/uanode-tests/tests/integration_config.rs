// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! Configuration files driving a running server and client.

use std::io::Write;
use std::time::Duration;

use uanode_client::ConnectionOptions;
use uanode_config::{ConfigError, ConfigLoader, UaNodeConfig};
use uanode_core::DeviceNodes;
use uanode_core::{StatusCode, WriteValue};
use uanode_tests::prelude::*;

// =============================================================================
// Test Helpers
// =============================================================================

const PLANT_YAML: &str = r#"
server:
  host: 127.0.0.1
  port: 4855
  resource_path: /UA/Plant
  session_timeout: 20s
  sweep_interval: 2s

security:
  allow_anonymous: false
  users:
    - username: operator
      password: secret

variables:
  simulation_enabled: false
  ranges:
    temperature:
      min: 0
      max: 50

client:
  connection_strategy:
    max_retry: 2
    initial_delay: 100ms
    max_delay: 1s
  request_timeout: 3s
  identity:
    type: user_name
    username: operator
    password: secret
"#;

fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// Client options taken from the `client` section, the way the `client`
/// command builds them.
fn client_options(config: &UaNodeConfig, url: String) -> ConnectionOptions {
    let client = &config.client;
    ConnectionOptions::new(url)
        .with_security(client.security())
        .with_strategy(client.connection_strategy)
        .with_request_timeout(client.request_timeout)
        .with_session_timeout(client.session_timeout)
        .with_identity(client.identity.clone())
}

// =============================================================================
// Loading Tests
// =============================================================================

#[tokio::test]
async fn test_config_file_drives_server_and_client() {
    let dir = temp_test_dir("uanode-config");
    let path = write_config(&dir, "uanode.yaml", PLANT_YAML);
    let config = ConfigLoader::builder()
        .env_prefix("UANODE_ITEST_PLANT")
        .build()
        .load(&path)
        .unwrap();

    assert_eq!(config.endpoint_url(), "opc.tcp://localhost:4855/UA/Plant");
    assert_eq!(config.client_endpoint_url(), "opc.tcp://localhost:4855/UA/Plant");
    assert_eq!(config.client.connection_strategy.initial_delay, Duration::from_millis(100));
    assert_eq!(config.security.pki_dir, dir.path().join("pki"));

    let harness = TestServer::start(config.clone());
    let mut client = harness.client_with(client_options(&config, harness.server().endpoint_url()));
    client.connect().await.unwrap();
    client.create_session().await.unwrap();

    let nodes = DeviceNodes::default();
    let statuses = client
        .write(&[
            WriteValue::value(nodes.temperature.clone(), 49.5),
            WriteValue::value(nodes.temperature.clone(), 60.0),
        ])
        .await
        .unwrap();
    assert_eq!(statuses, vec![StatusCode::GOOD, StatusCode::BAD_OUT_OF_RANGE]);

    harness.stop().await;
}

#[tokio::test]
async fn test_config_session_timeout_from_file() {
    let dir = temp_test_dir("uanode-config-timeout");
    let path = write_config(&dir, "uanode.toml", "[server]\nsession_timeout = \"7s\"\n");
    let config = ConfigLoader::builder()
        .env_prefix("UANODE_ITEST_TIMEOUT")
        .build()
        .load(&path)
        .unwrap();

    let mut config = config;
    config.server.host = "127.0.0.1".to_string();
    config.variables.simulation_enabled = false;
    let harness = TestServer::start(config);
    let mut client = harness.client();
    client.connect().await.unwrap();
    let session_id = client.create_session().await.unwrap();

    let info = harness.server().sessions().session(&session_id).unwrap();
    assert_eq!(info.timeout, Duration::from_secs(7));
    harness.stop().await;
}

#[test]
fn test_config_invalid_security_pair_rejected() {
    let dir = temp_test_dir("uanode-config-invalid");
    let path = write_config(
        &dir,
        "uanode.yaml",
        "security:\n  endpoints:\n    - mode: sign\n      policy: none\n",
    );
    let err = ConfigLoader::builder()
        .env_prefix("UANODE_ITEST_INVALID")
        .build()
        .load(&path)
        .unwrap_err();

    assert!(matches!(err, ConfigError::Validation { .. }));
    assert_eq!(err.field(), Some("security.endpoints[0]"));
}

#[test]
fn test_config_env_override_applies_to_file() {
    std::env::set_var("UANODE_ITEST_ENV_SERVER_PORT", "4999");
    std::env::set_var("UANODE_ITEST_ENV_VARIABLES_SIMULATION_ENABLED", "false");

    let dir = temp_test_dir("uanode-config-env");
    let path = write_config(&dir, "uanode.yaml", PLANT_YAML);
    let result = ConfigLoader::builder()
        .env_prefix("UANODE_ITEST_ENV")
        .build()
        .load(&path);

    std::env::remove_var("UANODE_ITEST_ENV_SERVER_PORT");
    std::env::remove_var("UANODE_ITEST_ENV_VARIABLES_SIMULATION_ENABLED");

    let config = result.unwrap();
    assert_eq!(config.server.port, 4999);
    assert!(!config.variables.simulation_enabled);
    assert_eq!(config.server.resource_path, "/UA/Plant");
}
