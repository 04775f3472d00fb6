// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use std::sync::Arc;

use uanode_config::UaNodeConfig;

use crate::cli::RunArgs;
use crate::error::BinResult;
use crate::runtime::ServerRuntime;

/// Starts the server and blocks until shutdown.
pub async fn run(mut config: UaNodeConfig, args: RunArgs) -> BinResult<()> {
    if args.no_simulation {
        config.variables.simulation_enabled = false;
    }
    ServerRuntime::new(Arc::new(config)).run().await
}
