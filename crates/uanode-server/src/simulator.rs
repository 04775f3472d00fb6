// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Periodic random updates of the sample variables.
//!
//! The simulator is an ordinary writer: it goes through
//! [`NodeStore::write_value_as`] like a client write, so range checks and
//! the audit log apply to it as well.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uanode_core::address_space::NodeStore;
use uanode_core::device::{DeviceNodes, INITIAL_HUMIDITY, INITIAL_TEMPERATURE};
use uanode_core::status::StatusCode;
use uanode_core::types::NodeId;
use uanode_core::variant::Variant;

/// Actor recorded in the audit log for simulated writes.
pub const SIMULATOR_ACTOR: &str = "simulator";

const TEMPERATURE_SPREAD: f64 = 5.0;
const HUMIDITY_SPREAD: f64 = 10.0;

/// Writes Temperature and Humidity every `interval`.
#[derive(Debug, Clone)]
pub struct ValueSimulator {
    store: Arc<NodeStore>,
    temperature: NodeId,
    humidity: NodeId,
    interval: Duration,
}

impl ValueSimulator {
    /// Creates a simulator for the sample device.
    pub fn new(store: Arc<NodeStore>, nodes: &DeviceNodes, interval: Duration) -> Self {
        Self {
            store,
            temperature: nodes.temperature.clone(),
            humidity: nodes.humidity.clone(),
            interval,
        }
    }

    /// Performs one update and returns the two write statuses.
    pub fn tick(&self) -> (StatusCode, StatusCode) {
        let (temperature, humidity) = {
            let mut rng = rand::thread_rng();
            (
                INITIAL_TEMPERATURE + rng.gen_range(0.0..TEMPERATURE_SPREAD),
                INITIAL_HUMIDITY + rng.gen_range(0.0..HUMIDITY_SPREAD),
            )
        };

        let t = self
            .store
            .write_value_as(SIMULATOR_ACTOR, &self.temperature, &Variant::Double(temperature));
        let h = self
            .store
            .write_value_as(SIMULATOR_ACTOR, &self.humidity, &Variant::Double(humidity));
        (t, h)
    }

    /// Runs until a shutdown signal arrives.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_ms = self.interval.as_millis() as u64,
                "Value simulator started"
            );
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let (t, h) = self.tick();
                        if !t.is_good() || !h.is_good() {
                            tracing::warn!(
                                temperature = %t,
                                humidity = %h,
                                "Simulated write rejected"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Value simulator stopped");
                        break;
                    }
                }
            }
        })
    }
}
