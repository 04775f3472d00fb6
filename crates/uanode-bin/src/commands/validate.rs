// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use serde_json::{json, Value};
use uanode_config::UaNodeConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Prints a summary of an already loaded and validated configuration.
pub fn validate(cli: &Cli, config: &UaNodeConfig, args: ValidateArgs) -> BinResult<()> {
    let source = cli
        .config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());
    let warnings = collect_warnings(config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", source);
            println!();
            println!("Summary:");
            println!("  Endpoint URL:    {}", config.endpoint_url());
            println!("  Bind address:    {}", config.bind_address());
            println!("  Security pairs:  {}", format_pairs(config));
            println!("  Anonymous:       {}", enabled(config.security.allow_anonymous));
            println!("  Users:           {}", config.security.users.len());
            println!("  PKI directory:   {}", config.security.pki_dir.display());
            println!("  Session timeout: {:?}", config.server.session_timeout);
            println!("  Simulation:      {}", enabled(config.variables.simulation_enabled));
            println!("  Client target:   {}", config.client_endpoint_url());

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", pretty(&redacted(config)?)?);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "valid": true,
                "config_path": source,
                "summary": {
                    "endpoint_url": config.endpoint_url(),
                    "bind_address": config.bind_address(),
                    "security_pairs": config.security.endpoints.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                    "allow_anonymous": config.security.allow_anonymous,
                    "users": config.security.users.len(),
                    "simulation_enabled": config.variables.simulation_enabled,
                    "client_endpoint_url": config.client_endpoint_url(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(redacted(config)?) } else { None },
            });
            println!("{}", pretty(&output)?);
        }
    }

    Ok(())
}

fn collect_warnings(config: &UaNodeConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.security.endpoints.iter().all(|p| !p.mode.requires_certificate()) {
        warnings.push("Only unsecured endpoints are advertised".to_string());
    }
    if config.security.requires_pki() && !config.security.pki_dir.exists() {
        warnings.push(format!(
            "PKI directory does not exist yet: {} (run `uanode init-pki`)",
            config.security.pki_dir.display()
        ));
    }
    if config.server.sweep_interval > config.server.session_timeout {
        warnings.push("Sweep interval is longer than the session timeout".to_string());
    }
    warnings
}

fn format_pairs(config: &UaNodeConfig) -> String {
    config
        .security
        .endpoints
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

fn pretty(value: &Value) -> BinResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| BinError::runtime(e.to_string()))
}

/// Serializes the configuration with every password masked.
fn redacted(config: &UaNodeConfig) -> BinResult<Value> {
    let mut value = serde_json::to_value(config).map_err(|e| BinError::runtime(e.to_string()))?;
    mask_passwords(&mut value);
    Ok(value)
}

fn mask_passwords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key == "password" {
                    *entry = Value::String("***".to_string());
                } else {
                    mask_passwords(entry);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_passwords),
        _ => {}
    }
}
