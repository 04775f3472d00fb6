// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode-server
//!
//! Server side of uanode: security negotiation, the session table, batched
//! attribute services and the TCP listener.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────── UaServer ────────────────────────────┐
//! │                                                                  │
//! │  listener ──► ServerConnection ──► SecurityNegotiator            │
//! │                     │                  └── StoreValidator        │
//! │                     │                        └── CertificateStore│
//! │                     ├──► SessionManager (sweep task)             │
//! │                     └──► AttributeExchange ──► NodeStore         │
//! │                                                  ▲               │
//! │                                 ValueSimulator ──┘               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`server`]: service dispatch and lifecycle
//! - [`listener`]: framed TCP transport
//! - [`session`]: session lifecycle and idle sweep
//! - [`exchange`]: per-item read, write and browse
//! - [`security`]: negotiation, certificate trust and PKI
//! - [`device`]: the sample device address space
//! - [`simulator`]: periodic value updates
//! - [`endpoint`]: endpoint descriptions

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod device;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod listener;
pub mod security;
pub mod server;
pub mod session;
pub mod simulator;

pub use device::{build_address_space, DeviceNodes};
pub use error::{ServerError, ServerResult};
pub use exchange::AttributeExchange;
pub use server::{ServerConnection, ServerState, UaServer, UaServerBuilder};
pub use session::{
    CloseReason, IdentityPolicy, SessionConfig, SessionManager, SessionState, SessionStatsSnapshot,
};
pub use simulator::ValueSimulator;
