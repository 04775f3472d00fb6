// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! The loader runs one pipeline for every source:
//!
//! 1. read the file and pick the format from its extension
//! 2. expand `${VAR}` and `${VAR:default}` placeholders
//! 3. deserialize (YAML through the `config` crate, TOML, JSON)
//! 4. apply `UANODE_*` environment overrides
//! 5. resolve relative paths against the file's directory
//! 6. validate
//!
//! # Examples
//!
//! ```no_run
//! use uanode_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load("uanode.yaml").unwrap();
//! println!("{}", config.endpoint_url());
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uanode_core::types::{SecurityMode, SecurityPolicy};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, UaNodeConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "UANODE";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads and validates [`UaNodeConfig`] documents.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    env_prefix: String,
    resolve_env_vars: bool,
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Creates a loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Returns a builder.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Loads configuration from a file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<UaNodeConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        debug!(format = format.extension(), "Detected configuration format");

        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            let base = self
                .base_path
                .clone()
                .or_else(|| path.parent().map(Path::to_path_buf))
                .unwrap_or_default();
            resolve_relative_paths(&mut config, &base);
        }

        config.validate()?;

        info!(
            endpoint = %config.endpoint_url(),
            endpoints = config.security.endpoints.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// Relative paths are resolved only when a base path was configured.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<UaNodeConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let mut config = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            if let Some(base) = &self.base_path {
                resolve_relative_paths(&mut config, base);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<UaNodeConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Expands `${VAR}` and `${VAR:default}` placeholders.
    ///
    /// Unknown variables without a default are kept verbatim.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            let inner = &after[..end];
            let (name, default) = match inner.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (inner, None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!(variable = name, "Environment variable not found");
                    result.push_str(&rest[start..start + 2 + end + 1]);
                }
            }
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    fn var(&self, suffix: &str) -> (String, Option<String>) {
        let name = format!("{}_{}", self.env_prefix, suffix);
        let value = env::var(&name).ok();
        (name, value)
    }

    /// Applies `UANODE_*` overrides on top of the parsed document.
    fn apply_env_overrides(&self, config: &mut UaNodeConfig) -> ConfigResult<()> {
        if let (_, Some(value)) = self.var("SERVER_HOST") {
            config.server.host = value;
        }
        if let (name, Some(value)) = self.var("SERVER_PORT") {
            config.server.port = value
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(name, "expected valid port number"))?;
        }
        if let (_, Some(value)) = self.var("SERVER_RESOURCE_PATH") {
            config.server.resource_path = value;
        }
        if let (_, Some(value)) = self.var("SERVER_HOSTNAME") {
            config.server.hostname_in_url = value;
        }
        if let (name, Some(value)) = self.var("SERVER_SESSION_TIMEOUT") {
            config.server.session_timeout = parse_duration(&name, &value)?;
        }

        if let (_, Some(value)) = self.var("SECURITY_ALLOW_ANONYMOUS") {
            config.security.allow_anonymous = parse_bool(&value);
        }
        if let (_, Some(value)) = self.var("SECURITY_REJECT_UNAUTHORIZED") {
            config.security.reject_unauthorized = parse_bool(&value);
        }
        if let (_, Some(value)) = self.var("SECURITY_PKI_DIR") {
            config.security.pki_dir = PathBuf::from(value);
        }

        if let (name, Some(value)) = self.var("VARIABLES_UPDATE_INTERVAL") {
            config.variables.update_interval = parse_duration(&name, &value)?;
        }
        if let (_, Some(value)) = self.var("VARIABLES_SIMULATION_ENABLED") {
            config.variables.simulation_enabled = parse_bool(&value);
        }

        if let (_, Some(value)) = self.var("CLIENT_ENDPOINT_URL") {
            config.client.endpoint_url = Some(value);
        }
        if let (name, Some(value)) = self.var("CLIENT_SECURITY_MODE") {
            config.client.security_mode = value
                .parse::<SecurityMode>()
                .map_err(|e| ConfigError::invalid_env_var(name, e.to_string()))?;
        }
        if let (name, Some(value)) = self.var("CLIENT_SECURITY_POLICY") {
            config.client.security_policy = value
                .parse::<SecurityPolicy>()
                .map_err(|e| ConfigError::invalid_env_var(name, e.to_string()))?;
        }
        if let (name, Some(value)) = self.var("CLIENT_MAX_RETRY") {
            config.client.connection_strategy.max_retry = value
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(name, "expected valid number"))?;
        }
        if let (name, Some(value)) = self.var("CLIENT_REQUEST_TIMEOUT") {
            config.client.request_timeout = parse_duration(&name, &value)?;
        }

        if let (name, Some(value)) = self.var("LOG_LEVEL") {
            config.logging.level = LogLevel::parse(&value)
                .ok_or_else(|| ConfigError::invalid_env_var(name, "expected a log level"))?;
        }
        if let (name, Some(value)) = self.var("LOG_FORMAT") {
            config.logging.format = LogFormat::parse(&value)
                .ok_or_else(|| ConfigError::invalid_env_var(name, "expected json, text or compact"))?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for [`ConfigLoader`].
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    base_path: Option<PathBuf>,
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
    resolve_paths: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base path for relative paths.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Enables or disables path resolution.
    pub fn resolve_paths(mut self, enabled: bool) -> Self {
        self.resolve_paths = Some(enabled);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        if let Some(base_path) = self.base_path {
            loader.base_path = Some(base_path);
        }
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(resolve_env_vars) = self.resolve_env_vars {
            loader.resolve_env_vars = resolve_env_vars;
        }
        if let Some(resolve_paths) = self.resolve_paths {
            loader.resolve_paths = resolve_paths;
        }
        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<UaNodeConfig> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

/// YAML goes through the `config` crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    // An empty document has no root mapping for `config` to deserialize.
    if content.trim().is_empty() {
        return serde_json::from_str("{}").map_err(|e| ConfigError::serialization(e.to_string()));
    }

    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

fn resolve_relative_paths(config: &mut UaNodeConfig, base_path: &Path) {
    if config.security.pki_dir.is_relative() {
        config.security.pki_dir = base_path.join(&config.security.pki_dir);
    }
    if let Some(ref mut log_file) = config.logging.file {
        if log_file.is_relative() {
            *log_file = base_path.join(&log_file);
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

fn parse_duration(name: &str, value: &str) -> ConfigResult<std::time::Duration> {
    humantime::parse_duration(value)
        .map_err(|e| ConfigError::invalid_env_var(name, format!("expected a duration: {}", e)))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<UaNodeConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<UaNodeConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
