// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode Integration Tests
//!
//! Shared fixtures, mock transports and a server harness for the uanode
//! integration suites.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: configurations, host snapshots and certificates
//!   - `mocks`: in-process loopback and always-failing transports
//!   - `harness`: a running server, in-process or over TCP
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p uanode-tests
//!
//! # Run one suite
//! cargo test -p uanode-tests --test integration_exchange
//! cargo test -p uanode-tests --test integration_client
//! cargo test -p uanode-tests --test integration_session
//! cargo test -p uanode-tests --test integration_security
//! cargo test -p uanode-tests --test integration_config
//! cargo test -p uanode-tests --test integration_tcp
//! ```
//!
//! ## Test Categories
//!
//! ### Exchange Tests (`integration_exchange.rs`)
//! - Read, write and read again over a loopback session
//! - Per-item status codes in mixed batches
//! - Read-only computed variables
//!
//! ### Client Tests (`integration_client.rs`)
//! - Exponential backoff and retry exhaustion
//! - Endpoint discovery and the verification cycle
//! - Session re-bind after a lost connection
//!
//! ### Session Tests (`integration_session.rs`)
//! - Idle sweep and expired sessions
//! - Shutdown closing every session
//!
//! ### Security Tests (`integration_security.rs`)
//! - Mode and policy negotiation
//! - Certificate trust decisions
//! - PKI initialization
//!
//! ### Config Tests (`integration_config.rs`)
//! - Loading YAML/TOML files and environment overrides
//!
//! ### TCP Tests (`integration_tcp.rs`)
//! - The full cycle over a real socket
//!
//! ## Writing New Tests
//!
//! Inside a `#[tokio::test]`:
//!
//! ```rust,no_run
//! use uanode_tests::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let harness = TestServer::start(ConfigFixtures::server());
//! let mut client = harness.client();
//! client.connect().await.unwrap();
//! // ... test logic
//! harness.stop().await;
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
}
