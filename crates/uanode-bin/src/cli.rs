// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: start the server (default)
//! - `client`: run one read-write-read verification cycle against a server
//! - `init-pki`: create the PKI directories and the application certificate
//! - `validate`: validate a configuration file
//! - `version`: show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Configuration file used when `--config` is not given and it exists.
pub const DEFAULT_CONFIG_FILE: &str = "uanode.yaml";

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uanode - sample OPC UA style server and client
#[derive(Parser, Debug)]
#[command(
    name = "uanode",
    author = "Sylvex <contact@sylvex.io>",
    version = uanode_core::VERSION,
    about = "Sample address-space server and verification client",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (defaults to ./uanode.yaml when present)
    #[arg(short, long, env = "UANODE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long, env = "UANODE_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact); overrides the config file
    #[arg(long, env = "UANODE_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the server
    ///
    /// This is the default command when no subcommand is specified.
    Run(RunArgs),

    /// Connect to a server and run one verification cycle
    ///
    /// Reads the sample variables, writes Temperature and Humidity, reads
    /// them back and disconnects. Exits non-zero on any fault.
    Client(ClientArgs),

    /// Create the PKI directories and a self-signed certificate
    #[command(name = "init-pki")]
    InitPki(InitPkiArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Disable the value simulator
    #[arg(long)]
    pub no_simulation: bool,
}

/// Arguments for the `client` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ClientArgs {
    /// Server endpoint URL; overrides `client.endpoint_url`
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Skip the settle delay before creating the session
    #[arg(long)]
    pub no_wait: bool,
}

/// Arguments for the `init-pki` command.
#[derive(Args, Debug, Default, Clone)]
pub struct InitPkiArgs {
    /// PKI root; overrides `security.pki_dir`
    #[arg(long)]
    pub pki_dir: Option<PathBuf>,

    /// Additional DNS name for the certificate (repeatable)
    #[arg(long = "hostname")]
    pub hostnames: Vec<String>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    #[default]
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<uanode_config::LogFormat> for LogFormat {
    fn from(format: uanode_config::LogFormat) -> Self {
        match format {
            uanode_config::LogFormat::Text => LogFormat::Text,
            uanode_config::LogFormat::Json => LogFormat::Json,
            uanode_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Returns the configuration file to load, if any.
    ///
    /// An explicit `--config` is always returned. Otherwise the default
    /// file is used only when it exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        }
    }

    /// Returns the log level forced by the command line, if any.
    pub fn log_level_override(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
