// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: start the server
//! - `client`: run the verification cycle
//! - `init-pki`: prepare the PKI directory
//! - `validate`: validate a configuration file
//! - `version`: show version information

mod client;
mod init_pki;
mod run;
mod validate;
mod version;

pub use client::{run_verification, VerificationReport};
pub use init_pki::init_pki;
pub use run::run;
pub use validate::validate;
pub use version::version;

use uanode_config::{ConfigFormat, ConfigLoader, UaNodeConfig};

use crate::cli::{Cli, Commands};
use crate::error::BinResult;
use crate::logging::{init_logging, LogSettings};

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    let command = cli.effective_command();
    if let Commands::Version = command {
        return version::version(&cli);
    }

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            // Install a logger anyway so that the failure is reported in
            // the configured format.
            let _ = init_logging(&LogSettings::resolve(&cli, None));
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e);
        }
    };
    init_logging(&LogSettings::resolve(&cli, Some(&config.logging)))?;

    match command {
        Commands::Run(args) => run::run(config, args).await,
        Commands::Client(args) => client::client(config, args).await,
        Commands::InitPki(args) => init_pki::init_pki(&config, args).await,
        Commands::Validate(args) => validate::validate(&cli, &config, args),
        Commands::Version => version::version(&cli),
    }
}

/// Loads the configuration file named on the command line, or the
/// defaults plus `UANODE_*` overrides when there is none.
pub fn load_configuration(cli: &Cli) -> BinResult<UaNodeConfig> {
    let loader = ConfigLoader::new();
    let config = match cli.config_path() {
        Some(path) => loader.load(&path)?,
        None => loader.load_from_str("", ConfigFormat::Yaml)?,
    };
    Ok(config)
}
