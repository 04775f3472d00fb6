// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode-client
//!
//! Client side of uanode.
//!
//! - [`transport`]: the [`Transport`] seam and the framed TCP transport
//! - [`connection`]: connection state machine with exponential backoff and
//!   session re-bind
//! - [`client`]: the [`UaClient`] read, write and browse API
//!
//! Errors are the shared [`UaError`](uanode_core::UaError) taxonomy;
//! [`UaError::is_retryable`](uanode_core::UaError::is_retryable) decides
//! whether a failure is worth another connection attempt.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod connection;
pub mod transport;

pub use client::UaClient;
pub use connection::{ActiveSession, ClientStats, ConnectionManager, ConnectionOptions, ConnectionState};
pub use transport::{EndpointAddress, TcpTransport, Transport};
