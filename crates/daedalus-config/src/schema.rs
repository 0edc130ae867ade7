//! Configuration schema types.
//!
//! This module defines the structure of all configuration sections.

use serde::{Deserialize, Serialize};

/// Service section: how the dispatcher polices and answers calls.
///
/// # Example
///
/// ```
/// use daedalus_config::ServiceSection;
///
/// let section = ServiceSection {
///     debug: true,
///     stateless: Some(true),
///     ..Default::default()
/// };
/// assert!(section.force_secure_connection);
/// assert_eq!(section.contract_cache_ttl_secs, 3600);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    /// Reject calls that did not arrive over a secure channel.
    #[serde(default = "default_true")]
    pub force_secure_connection: bool,

    /// Debug mode: contracts are re-extracted on every call and fault
    /// details reach the caller.
    #[serde(default)]
    pub debug: bool,

    /// Overrides the service's own stateless flag when set.
    #[serde(default)]
    pub stateless: Option<bool>,

    /// Authenticate through the caller identity instead of the authorizer
    /// verdict.
    #[serde(default)]
    pub identity_mode: bool,

    /// Reject calls with an empty body.
    #[serde(default)]
    pub reject_empty_body: bool,

    /// Lifetime of cached contracts in seconds.
    #[serde(default = "default_contract_ttl")]
    pub contract_cache_ttl_secs: u64,

    /// Show internal fault messages to callers outside debug mode.
    #[serde(default)]
    pub expose_internal_errors: bool,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            force_secure_connection: true,
            debug: false,
            stateless: None,
            identity_mode: false,
            reject_empty_body: false,
            contract_cache_ttl_secs: default_contract_ttl(),
            expose_internal_errors: false,
        }
    }
}

fn default_contract_ttl() -> u64 {
    3600
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log filter directive (`info`, `daedalus_pipeline=debug`, ...).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name attached to log records.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deployment environment (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            environment: default_environment(),
            logging: LoggingSection::default(),
        }
    }
}

impl TelemetrySection {
    /// Converts the section into the logging setup of `daedalus-telemetry`.
    #[must_use]
    pub fn log_config(&self) -> daedalus_telemetry::LogConfig {
        daedalus_telemetry::LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            json_format: self.logging.format == LogFormat::Json,
            ansi: self.logging.ansi_enabled,
            file_line_info: self.logging.include_location,
            service_name: self.service_name.clone(),
            ..daedalus_telemetry::LogConfig::default()
        }
    }
}

fn default_service_name() -> String {
    "daedalus-service".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Outbound client section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    /// Base URLs tried in order until one answers.
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Path prepended to every action id.
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_client_timeout")]
    pub timeout_ms: u64,

    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            api_path: default_api_path(),
            timeout_ms: default_client_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_api_path() -> String {
    "/api".to_string()
}

fn default_client_timeout() -> u64 {
    30000
}

fn default_user_agent() -> String {
    "FTS-API-Client".to_string()
}

fn default_true() -> bool {
    true
}
