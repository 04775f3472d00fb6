// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for uanode.
//!
//! # Schema Structure
//!
//! ```text
//! UaNodeConfig
//! ├── server: ServerConfig
//! ├── security: SecurityConfig
//! ├── variables: VariablesConfig
//! ├── client: ClientConfig
//! └── logging: LoggingConfig
//! ```
//!
//! Every section has defaults, so an empty document is a valid
//! configuration that serves the sample device on `opc.tcp://localhost:4334/UA/MyServer`.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uanode_core::address_space::ValueRange;
use uanode_core::retry::ConnectionStrategy;
use uanode_core::types::{
    humantime_serde, SecurityMode, SecurityPair, SecurityPolicy, UserIdentity,
};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default listening port.
pub const DEFAULT_PORT: u16 = 4334;

/// Default endpoint resource path.
pub const DEFAULT_RESOURCE_PATH: &str = "/UA/MyServer";

/// Default maximum number of concurrent sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 100;

/// Default session idle timeout.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval of the idle-session sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Default simulator update interval.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(1000);

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for uanode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UaNodeConfig {
    /// Server identity and listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Endpoint security and identity settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Sample variable settings.
    #[serde(default)]
    pub variables: VariablesConfig,

    /// Verification client settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl UaNodeConfig {
    /// Validates the entire configuration.
    ///
    /// The first violation is returned as [`ConfigError::Validation`].
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.security.validate()?;
        self.variables.validate()?;
        self.client.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Endpoint URL the server advertises.
    pub fn endpoint_url(&self) -> String {
        format!(
            "opc.tcp://{}:{}{}",
            self.server.hostname_in_url, self.server.port, self.server.resource_path
        )
    }

    /// Endpoint URL the client connects to.
    ///
    /// Falls back to the local server endpoint when none is configured.
    pub fn client_endpoint_url(&self) -> String {
        self.client.endpoint_url.clone().unwrap_or_else(|| {
            format!(
                "opc.tcp://localhost:{}{}",
                self.server.port, self.server.resource_path
            )
        })
    }

    /// Socket address the server binds.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Server identity, listener and session lifetime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Resource path appended to the endpoint URL.
    #[serde(default = "default_resource_path")]
    pub resource_path: String,

    /// Host name used in advertised endpoint URLs.
    #[serde(default = "default_hostname_in_url")]
    pub hostname_in_url: String,

    /// Product build information.
    #[serde(default)]
    pub build_info: BuildInfo,

    /// Application URI.
    #[serde(default = "default_application_uri")]
    pub application_uri: String,

    /// Application name.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Maximum number of concurrent sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle time after which a session expires.
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Interval of the idle-session sweep.
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// How long closed session ids are remembered.
    #[serde(default = "default_closed_session_retention", with = "humantime_serde")]
    pub closed_session_retention: Duration,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_resource_path() -> String {
    DEFAULT_RESOURCE_PATH.to_string()
}

fn default_hostname_in_url() -> String {
    "localhost".to_string()
}

fn default_application_uri() -> String {
    "urn:localhost:uanode:MyServer".to_string()
}

fn default_application_name() -> String {
    "uanode Server".to_string()
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_session_timeout() -> Duration {
    DEFAULT_SESSION_TIMEOUT
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

fn default_closed_session_retention() -> Duration {
    Duration::from_secs(300)
}

impl ServerConfig {
    /// Validates the server configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::validation("server.port", "must not be 0"));
        }
        if !self.resource_path.starts_with('/') {
            return Err(ConfigError::validation(
                "server.resource_path",
                format!("must start with '/', got '{}'", self.resource_path),
            ));
        }
        if self.hostname_in_url.is_empty() {
            return Err(ConfigError::validation(
                "server.hostname_in_url",
                "cannot be empty",
            ));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::validation(
                "server.max_sessions",
                "must be at least 1",
            ));
        }
        if self.session_timeout.is_zero() {
            return Err(ConfigError::validation(
                "server.session_timeout",
                "must be greater than zero",
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::validation(
                "server.sweep_interval",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            resource_path: default_resource_path(),
            hostname_in_url: default_hostname_in_url(),
            build_info: BuildInfo::default(),
            application_uri: default_application_uri(),
            application_name: default_application_name(),
            max_sessions: default_max_sessions(),
            session_timeout: default_session_timeout(),
            sweep_interval: default_sweep_interval(),
            closed_session_retention: default_closed_session_retention(),
        }
    }
}

/// Product build information published by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildInfo {
    /// Product name.
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Product URI.
    #[serde(default = "default_product_uri")]
    pub product_uri: String,

    /// Manufacturer name.
    #[serde(default = "default_manufacturer_name")]
    pub manufacturer_name: String,

    /// Build number.
    #[serde(default = "default_build_number")]
    pub build_number: String,
}

fn default_product_name() -> String {
    "MySampleServer".to_string()
}

fn default_product_uri() -> String {
    "urn:uanode:Server".to_string()
}

fn default_manufacturer_name() -> String {
    "Sylvex".to_string()
}

fn default_build_number() -> String {
    "1.0.0".to_string()
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            product_uri: default_product_uri(),
            manufacturer_name: default_manufacturer_name(),
            build_number: default_build_number(),
        }
    }
}

// =============================================================================
// Security Configuration
// =============================================================================

/// Advertised endpoints, identity policy and PKI location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Advertised (mode, policy) pairs, in preference order.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<SecurityPair>,

    /// Whether anonymous sessions are accepted.
    #[serde(default = "default_true")]
    pub allow_anonymous: bool,

    /// Accounts accepted for UserName identity tokens.
    #[serde(default)]
    pub users: Vec<UserAccount>,

    /// PKI root directory.
    #[serde(default = "default_pki_dir")]
    pub pki_dir: PathBuf,

    /// Reject certificates that are not explicitly trusted.
    #[serde(default)]
    pub reject_unauthorized: bool,
}

fn default_endpoints() -> Vec<SecurityPair> {
    vec![SecurityPair::none()]
}

fn default_true() -> bool {
    true
}

fn default_pki_dir() -> PathBuf {
    PathBuf::from("./pki")
}

impl SecurityConfig {
    /// Validates the security configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::validation(
                "security.endpoints",
                "at least one endpoint is required",
            ));
        }
        for (i, pair) in self.endpoints.iter().enumerate() {
            if !pair.is_consistent() {
                return Err(ConfigError::validation(
                    format!("security.endpoints[{}]", i),
                    format!(
                        "mode '{}' cannot be combined with policy '{}'",
                        pair.mode, pair.policy
                    ),
                ));
            }
        }

        let mut names = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() {
                return Err(ConfigError::validation(
                    "security.users",
                    "username cannot be empty",
                ));
            }
            if !names.insert(user.username.as_str()) {
                return Err(ConfigError::validation(
                    "security.users",
                    format!("duplicate username '{}'", user.username),
                ));
            }
        }

        if !self.allow_anonymous && self.users.is_empty() {
            return Err(ConfigError::validation(
                "security.allow_anonymous",
                "anonymous access is disabled and no users are configured",
            ));
        }
        Ok(())
    }

    /// Returns `true` if any advertised endpoint requires a certificate.
    pub fn requires_pki(&self) -> bool {
        self.endpoints.iter().any(|p| p.mode.requires_certificate())
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            allow_anonymous: true,
            users: Vec::new(),
            pki_dir: default_pki_dir(),
            reject_unauthorized: false,
        }
    }
}

/// An account accepted for UserName identity tokens.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserAccount {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl std::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAccount")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// =============================================================================
// Variables Configuration
// =============================================================================

/// Sample variable and simulator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariablesConfig {
    /// Simulator tick interval.
    #[serde(default = "default_update_interval", with = "humantime_serde")]
    pub update_interval: Duration,

    /// Accepted write ranges.
    #[serde(default)]
    pub ranges: VariableRanges,

    /// Whether the simulator runs.
    #[serde(default = "default_true")]
    pub simulation_enabled: bool,
}

fn default_update_interval() -> Duration {
    DEFAULT_UPDATE_INTERVAL
}

impl VariablesConfig {
    /// Validates the variables configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.update_interval.is_zero() {
            return Err(ConfigError::validation(
                "variables.update_interval",
                "must be greater than zero",
            ));
        }
        check_range("variables.ranges.temperature", &self.ranges.temperature)?;
        check_range("variables.ranges.humidity", &self.ranges.humidity)?;
        Ok(())
    }
}

fn check_range(field: &str, range: &ValueRange) -> ConfigResult<()> {
    if !range.is_valid() {
        return Err(ConfigError::validation(
            field,
            format!("min ({}) must be less than max ({})", range.min, range.max),
        ));
    }
    Ok(())
}

impl Default for VariablesConfig {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
            ranges: VariableRanges::default(),
            simulation_enabled: true,
        }
    }
}

/// Write ranges of the read-write sample variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableRanges {
    /// Temperature range.
    #[serde(default = "default_temperature_range")]
    pub temperature: ValueRange,

    /// Humidity range.
    #[serde(default = "default_humidity_range")]
    pub humidity: ValueRange,
}

fn default_temperature_range() -> ValueRange {
    ValueRange::new(-20.0, 100.0)
}

fn default_humidity_range() -> ValueRange {
    ValueRange::new(0.0, 100.0)
}

impl Default for VariableRanges {
    fn default() -> Self {
        Self {
            temperature: default_temperature_range(),
            humidity: default_humidity_range(),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Settings of the verification client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Endpoint to connect to. Derived from the server section when absent.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Requested security mode.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Requested security policy.
    #[serde(default)]
    pub security_policy: SecurityPolicy,

    /// Connection retry bounds.
    #[serde(default)]
    pub connection_strategy: ConnectionStrategy,

    /// Deadline of a single request round trip.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Requested session timeout.
    #[serde(default = "default_session_timeout", with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Settle delay between connecting and creating the session.
    #[serde(default = "default_ready_wait", with = "humantime_serde")]
    pub ready_wait: Duration,

    /// Identity presented when creating a session.
    #[serde(default)]
    pub identity: UserIdentity,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_ready_wait() -> Duration {
    Duration::from_secs(2)
}

impl ClientConfig {
    /// Returns the requested security pair.
    pub fn security(&self) -> SecurityPair {
        SecurityPair::new(self.security_mode, self.security_policy)
    }

    /// Validates the client configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(url) = &self.endpoint_url {
            if !url.starts_with("opc.tcp://") {
                return Err(ConfigError::validation(
                    "client.endpoint_url",
                    format!("expected an opc.tcp:// URL, got '{}'", url),
                ));
            }
        }
        if !self.security().is_consistent() {
            return Err(ConfigError::validation(
                "client.security_policy",
                format!(
                    "mode '{}' cannot be combined with policy '{}'",
                    self.security_mode, self.security_policy
                ),
            ));
        }
        self.connection_strategy
            .validate()
            .map_err(|msg| ConfigError::validation("client.connection_strategy", msg))?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::validation(
                "client.request_timeout",
                "must be greater than zero",
            ));
        }
        if self.session_timeout.is_zero() {
            return Err(ConfigError::validation(
                "client.session_timeout",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            security_mode: SecurityMode::None,
            security_policy: SecurityPolicy::None,
            connection_strategy: ConnectionStrategy::default(),
            request_timeout: default_request_timeout(),
            session_timeout: default_session_timeout(),
            ready_wait: default_ready_wait(),
            identity: UserIdentity::Anonymous,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log file path (optional).
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(file) = &self.file {
            if file.as_os_str().is_empty() {
                return Err(ConfigError::validation("logging.file", "cannot be empty"));
            }
        }
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, accepting `warning` for `warn`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-field lines.
    Text,
    /// Compact single lines.
    Compact,
}

impl LogFormat {
    /// Parses a format name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" | "pretty" => Some(LogFormat::Text),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = UaNodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 4334);
        assert_eq!(config.endpoint_url(), "opc.tcp://localhost:4334/UA/MyServer");
        assert_eq!(
            config.client_endpoint_url(),
            "opc.tcp://localhost:4334/UA/MyServer"
        );
        assert_eq!(config.security.endpoints, vec![SecurityPair::none()]);
        assert_eq!(config.server.session_timeout, Duration::from_secs(60));
        assert_eq!(config.client.connection_strategy.max_retry, 3);
    }

    #[test]
    fn test_port_zero_rejected() {
        let mut config = UaNodeConfig::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field(), Some("server.port"));
    }

    #[test]
    fn test_resource_path_must_be_absolute() {
        let mut config = UaNodeConfig::default();
        config.server.resource_path = "UA/MyServer".into();
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("server.resource_path")
        );
    }

    #[test]
    fn test_inconsistent_endpoint_rejected() {
        let mut config = UaNodeConfig::default();
        config.security.endpoints = vec![SecurityPair::new(
            SecurityMode::None,
            SecurityPolicy::Basic256Sha256,
        )];
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("security.endpoints[0]")
        );

        config.security.endpoints.clear();
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("security.endpoints")
        );
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = UaNodeConfig::default();
        config.variables.ranges.humidity = ValueRange::new(50.0, 50.0);
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("variables.ranges.humidity")
        );
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut config = UaNodeConfig::default();
        config.server.sweep_interval = Duration::ZERO;
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("server.sweep_interval")
        );

        let mut config = UaNodeConfig::default();
        config.variables.update_interval = Duration::ZERO;
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("variables.update_interval")
        );
    }

    #[test]
    fn test_connection_strategy_rejected() {
        let mut config = UaNodeConfig::default();
        config.client.connection_strategy.max_retry = 0;
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("client.connection_strategy")
        );
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let mut config = UaNodeConfig::default();
        let account = UserAccount {
            username: "operator".into(),
            password: "pw".into(),
        };
        config.security.users = vec![account.clone(), account];
        assert_eq!(
            config.validate().unwrap_err().field(),
            Some("security.users")
        );
    }

    #[test]
    fn test_user_account_debug_hides_password() {
        let account = UserAccount {
            username: "operator".into(),
            password: "secret".into(),
        };
        let debug = format!("{:?}", account);
        assert!(debug.contains("operator"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Text));
    }
}
