// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core types and address-space model for uanode.
//!
//! This crate holds everything the server and the client share, plus the
//! I/O-free server components:
//!
//! - [`address_space`]: the node store and value accessors
//! - [`access`]: per-operation access decisions
//! - [`device`]: ids of the sample device nodes
//! - [`types`], [`variant`], [`status`]: identifiers, values and status codes
//! - [`protocol`]: service messages and framing
//! - [`retry`]: connection backoff
//! - [`error`]: the shared error taxonomy
//!
//! # Error Handling
//!
//! ```text
//! UaError
//! ├── NotFound          - unknown node or session
//! ├── AccessDenied      - access flags or authorization
//! ├── TypeMismatch      - value coercion failure
//! ├── SecurityRejected  - negotiation failure
//! ├── ConnectionFailed  - transport failure or retry exhaustion
//! ├── SessionExpired    - idle timeout or invalidated session
//! └── Fatal             - unrecoverable failure
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod access;
pub mod address_space;
pub mod device;
pub mod error;
pub mod protocol;
pub mod retry;
pub mod status;
pub mod types;
pub mod variant;

// =============================================================================
// Re-exports
// =============================================================================

pub use access::{AccessController, AccessDecision, AccessOperation, AuthorizationContext, DenyReason};
pub use address_space::{NodeStore, ValueAccessor, VariableSpec};
pub use device::DeviceNodes;
pub use error::{ErrorKind, UaError, UaResult};
pub use protocol::{ReadValueId, Request, Response, SessionId, WriteValue};
pub use retry::{BackoffState, ConnectionStrategy, RetryDecision};
pub use status::StatusCode;
pub use types::{
    AccessLevel, AttributeId, DataType, EndpointDescription, NodeClass, NodeId, SecurityMode,
    SecurityPair, SecurityPolicy, UserIdentity,
};
pub use variant::{DataValue, Variant};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
