// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Host process state read by computed variables.
//!
//! Computed variables never capture external state directly. They ask a
//! [`HostInfo`] provider for a fresh [`HostSnapshot`] on every read.

use std::fmt;
use std::time::{Duration, Instant};

use sysinfo::System;

/// Point-in-time view of the host and the server process.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSnapshot {
    /// Host name.
    pub hostname: String,
    /// Time since the server process started.
    pub process_uptime: Duration,
    /// One-minute load average.
    pub load_average_1m: f64,
}

/// Source of [`HostSnapshot`]s.
pub trait HostInfo: Send + Sync + fmt::Debug {
    /// Takes a snapshot now.
    fn snapshot(&self) -> HostSnapshot;
}

/// Reads the live system through `sysinfo`.
#[derive(Debug)]
pub struct SystemHostInfo {
    started: Instant,
}

impl SystemHostInfo {
    /// Creates a provider whose uptime counts from now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Creates a provider whose uptime counts from `started`.
    pub fn started_at(started: Instant) -> Self {
        Self { started }
    }
}

impl Default for SystemHostInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInfo for SystemHostInfo {
    fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            hostname: System::host_name().unwrap_or_else(|| "localhost".to_string()),
            process_uptime: self.started.elapsed(),
            load_average_1m: System::load_average().one,
        }
    }
}

/// Returns a fixed snapshot. Used by tests and simulations.
#[derive(Debug, Clone)]
pub struct FixedHostInfo {
    snapshot: HostSnapshot,
}

impl FixedHostInfo {
    /// Creates a provider that always returns `snapshot`.
    pub fn new(snapshot: HostSnapshot) -> Self {
        Self { snapshot }
    }
}

impl HostInfo for FixedHostInfo {
    fn snapshot(&self) -> HostSnapshot {
        self.snapshot.clone()
    }
}
