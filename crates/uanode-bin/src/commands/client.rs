// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `client` command: one read-write-read cycle.

use std::time::Duration;

use tracing::{error, info, warn};
use uanode_client::{ConnectionOptions, UaClient};
use uanode_config::UaNodeConfig;
use uanode_core::device::{DeviceNodes, INITIAL_HUMIDITY, INITIAL_TEMPERATURE};
use uanode_core::error::UaResult;
use uanode_core::protocol::{SessionId, WriteValue};
use uanode_core::status::StatusCode;
use uanode_core::types::NodeId;
use uanode_core::variant::DataValue;
use uanode_server::security::PkiLayout;

use crate::cli::ClientArgs;
use crate::error::{BinError, BinResult};

/// What one verification cycle observed.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// Number of endpoints the server advertised.
    pub endpoints: usize,
    /// Session used for the cycle.
    pub session_id: SessionId,
    /// First read of the five sample variables.
    pub initial: Vec<DataValue>,
    /// Status of the Temperature and Humidity writes.
    pub write_statuses: Vec<StatusCode>,
    /// Second read of the five sample variables.
    pub after_write: Vec<DataValue>,
}

/// Connects with the configured options and runs the cycle.
pub async fn client(config: UaNodeConfig, args: ClientArgs) -> BinResult<()> {
    let options = connection_options(&config, args.endpoint).await?;
    let ready_wait = if args.no_wait {
        Duration::ZERO
    } else {
        config.client.ready_wait
    };

    let mut client = UaClient::tcp(options);
    run_verification(&mut client, ready_wait)
        .await
        .map(|_| ())
        .map_err(BinError::from)
}

async fn connection_options(
    config: &UaNodeConfig,
    endpoint: Option<String>,
) -> BinResult<ConnectionOptions> {
    let client = &config.client;
    let mut options = ConnectionOptions::new(endpoint.unwrap_or_else(|| config.client_endpoint_url()))
        .with_security(client.security())
        .with_strategy(client.connection_strategy)
        .with_request_timeout(client.request_timeout)
        .with_session_timeout(client.session_timeout)
        .with_identity(client.identity.clone());

    if client.security_mode.requires_certificate() {
        let layout = PkiLayout::new(&config.security.pki_dir);
        match layout.load_own_certificate(&config.server.application_name).await? {
            Some(certificate) => options = options.with_certificate(certificate),
            None => {
                return Err(BinError::config(format!(
                    "security mode {} needs a certificate; run `uanode init-pki` first",
                    client.security_mode
                )))
            }
        }
    }
    Ok(options)
}

/// Runs connect, endpoint listing, session creation, read, write, read and
/// close. The client is always disconnected afterwards.
pub async fn run_verification(client: &mut UaClient, ready_wait: Duration) -> UaResult<VerificationReport> {
    let result = verification_steps(client, ready_wait).await;
    client.disconnect().await;

    match &result {
        Ok(report) => info!(
            session_id = %report.session_id,
            writes = report.write_statuses.len(),
            "Verification cycle completed"
        ),
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "Verification cycle failed");
            if let Some(hint) = e.recovery_hint() {
                warn!("{}", hint);
            }
        }
    }
    result
}

async fn verification_steps(client: &mut UaClient, ready_wait: Duration) -> UaResult<VerificationReport> {
    client.connect().await?;
    let endpoints = client.get_endpoints().await?;

    if !ready_wait.is_zero() {
        info!(wait_ms = ready_wait.as_millis() as u64, "Waiting for the server to settle");
        tokio::time::sleep(ready_wait).await;
    }

    let session_id = client.create_session().await?;
    let nodes = DeviceNodes::default();
    let variables = nodes.variables();

    let initial = client.read_values(&variables).await?;
    log_values("Initial value", &variables, &initial);

    let writes = [
        WriteValue::value(nodes.temperature.clone(), INITIAL_TEMPERATURE),
        WriteValue::value(nodes.humidity.clone(), INITIAL_HUMIDITY),
    ];
    let write_statuses = client.write(&writes).await?;
    for (item, status) in writes.iter().zip(&write_statuses) {
        info!(node_id = %item.node_id, value = %item.value, status = %status, "Write result");
    }

    let after_write = client.read_values(&variables).await?;
    log_values("Value after write", &variables, &after_write);

    client.close_session().await?;

    if write_statuses.iter().any(|s| s.is_bad()) {
        warn!("Some writes were rejected");
    }
    Ok(VerificationReport {
        endpoints: endpoints.len(),
        session_id,
        initial,
        write_statuses,
        after_write,
    })
}

fn log_values(message: &str, nodes: &[NodeId], values: &[DataValue]) {
    for (node, value) in nodes.iter().zip(values) {
        match &value.value {
            Some(v) if value.is_good() => info!(node_id = %node, value = %v, "{}", message),
            _ => warn!(node_id = %node, status = %value.status, "{}", message),
        }
    }
}

