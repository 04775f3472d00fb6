// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! uanode entry point.

use std::process::ExitCode;

use uanode_bin::cli::Cli;
use uanode_bin::commands;
use uanode_bin::error::exit_code;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    exit_code(commands::execute(cli).await)
}
