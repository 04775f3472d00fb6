// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uanode-config
//!
//! Configuration management for uanode.
//!
//! ## Features
//!
//! - **Schema Definition**: one `UaNodeConfig` with defaults for every section
//! - **Multi-Format Support**: YAML, TOML and JSON files
//! - **Environment Overrides**: `UANODE_*` variables and `${VAR:default}` placeholders
//! - **Validation**: field-level errors before anything starts
//!
//! ## Quick Start
//!
//! ```no_run
//! use uanode_config::load_config;
//!
//! let config = load_config("uanode.yaml").unwrap();
//! println!("Endpoint: {}", config.endpoint_url());
//! ```
//!
//! ## Configuration Schema
//!
//! - `server` - listener, identity and session lifetime
//! - `security` - advertised endpoints, identities and PKI
//! - `variables` - simulator interval and write ranges
//! - `client` - verification client endpoint and retry strategy
//! - `logging` - level, format and file

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder};
pub use schema::{
    BuildInfo, ClientConfig, LogFormat, LogLevel, LoggingConfig, SecurityConfig, ServerConfig,
    UaNodeConfig, UserAccount, VariableRanges, VariablesConfig,
};
