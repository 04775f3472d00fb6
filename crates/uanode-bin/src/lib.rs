// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode-bin
//!
//! The `uanode` executable.
//!
//! ## Architecture
//!
//! ```text
//!                      main.rs
//!                         │
//!                      cli.rs
//!                         │
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!     commands        logging        runtime ──► shutdown
//!          │                             │
//!          ▼                             ▼
//!    uanode-client                 uanode-server
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the server (default command)
//! uanode
//!
//! # Start with a custom config
//! uanode -c /etc/uanode/uanode.yaml run
//!
//! # Run the verification client against a running server
//! uanode client --endpoint opc.tcp://localhost:4334/UA/MyServer
//!
//! # Create the PKI directory and the application certificate
//! uanode init-pki
//! ```
//!
//! Exit codes: 0 on success or clean shutdown, 1 on initialisation or
//! runtime failure, 2 on configuration errors.

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use commands::{run_verification, VerificationReport};
pub use error::{BinError, BinResult};
pub use logging::{init_logging, LogSettings};
pub use runtime::ServerRuntime;
pub use shutdown::ShutdownCoordinator;
