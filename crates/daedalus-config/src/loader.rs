//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, `.env` files and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, DaedalusConfig, LogFormat};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON)
/// 3. Variables read from a `.env` file
/// 4. Process environment variables
///
/// # Example
///
/// ```no_run
/// use daedalus_config::ConfigLoader;
///
/// # fn main() -> Result<(), daedalus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("daedalus.toml")?
///     .with_env_prefix("DAEDALUS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: DaedalusConfig,
    env_prefix: Option<String>,
    dotenv_vars: Vec<(String, String)>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DaedalusConfig::default(),
            env_prefix: None,
            dotenv_vars: Vec::new(),
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = DaedalusConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_development()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.service.debug);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DaedalusConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DaedalusConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format (TOML or JSON) is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON or unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = parse(&content, &extension)?;

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format
    /// (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [service]
    ///     identity_mode = true
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.service.identity_mode);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`, e.g.
    /// `DAEDALUS__SERVICE__DEBUG=true` or
    /// `DAEDALUS__TELEMETRY__LOGGING__LEVEL=debug`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Read variables from `.env` in the current directory or its parents.
    ///
    /// A missing file is ignored. Variables are applied as overrides under
    /// the configured prefix; the process environment wins over them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn with_dotenv(mut self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv_iter() {
            Ok(iter) => {
                for item in iter {
                    self.dotenv_vars.push(item?);
                }
                Ok(self)
            }
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Read variables from a specific `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or cannot be parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        for item in dotenvy::from_path_iter(path)? {
            self.dotenv_vars.push(item?);
        }
        Ok(self)
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies `.env` and environment overrides (if a prefix was set) and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().load().unwrap();
    /// assert_eq!(config.service.contract_cache_ttl_secs, 3600);
    /// ```
    pub fn load(mut self) -> Result<DaedalusConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let dotenv_vars = std::mem::take(&mut self.dotenv_vars);
            for (key, value) in dotenv_vars.iter().filter(|(k, _)| k.starts_with(&prefix)) {
                self.apply_env_var(key, value, &prefix)?;
            }
            let process_vars: Vec<(String, String)> =
                env::vars().filter(|(k, _)| k.starts_with(&prefix)).collect();
            for (key, value) in &process_vars {
                self.apply_env_var(key, value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> DaedalusConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let service = &mut self.config.service;
        let telemetry = &mut self.config.telemetry;
        let client = &mut self.config.client;

        match parts.as_slice() {
            ["SERVICE", "FORCE_SECURE_CONNECTION"] => {
                service.force_secure_connection = bool_var(key, value)?;
            }
            ["SERVICE", "DEBUG"] => service.debug = bool_var(key, value)?,
            ["SERVICE", "STATELESS"] => {
                service.stateless = if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(bool_var(key, value)?)
                };
            }
            ["SERVICE", "IDENTITY_MODE"] => service.identity_mode = bool_var(key, value)?,
            ["SERVICE", "REJECT_EMPTY_BODY"] => service.reject_empty_body = bool_var(key, value)?,
            ["SERVICE", "CONTRACT_CACHE_TTL_SECS"] => {
                service.contract_cache_ttl_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["SERVICE", "EXPOSE_INTERNAL_ERRORS"] => {
                service.expose_internal_errors = bool_var(key, value)?;
            }

            ["TELEMETRY", "SERVICE_NAME"] => telemetry.service_name = value.to_string(),
            ["TELEMETRY", "ENVIRONMENT"] => telemetry.environment = value.to_string(),
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                telemetry.logging.enabled = bool_var(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "ANSI_ENABLED"] => {
                telemetry.logging.ansi_enabled = bool_var(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                telemetry.logging.include_location = bool_var(key, value)?;
            }

            ["CLIENT", "HOSTS"] => {
                client.hosts = value
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["CLIENT", "API_PATH"] => client.api_path = value.to_string(),
            ["CLIENT", "TIMEOUT_MS"] => {
                client.timeout_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["CLIENT", "USER_AGENT"] => client.user_agent = value.to_string(),

            _ => {}
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<DaedalusConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::unsupported_format(other)),
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert!(config.service.debug);
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_with_string_toml() {
        let toml = r#"
            [service]
            force_secure_connection = false
            stateless = true

            [client]
            hosts = ["https://a.example.com", "https://b.example.com"]
        "#;
        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();
        assert!(!config.service.force_secure_connection);
        assert_eq!(config.service.stateless, Some(true));
        assert_eq!(config.client.hosts.len(), 2);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"service": {"debug": true}, "telemetry": {"service_name": "users"}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "JSON")
            .unwrap()
            .load()
            .unwrap();
        assert!(config.service.debug);
        assert_eq!(config.telemetry.service_name, "users");
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = ConfigLoader::new().with_string("[server]\nport = 1", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_loader_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daedalus.toml");
        fs::write(&path, "[service]\nreject_empty_body = true\n").unwrap();

        let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();
        assert!(config.service.reject_empty_body);
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigLoader::new().with_file(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new()
            .with_optional_file(dir.path().join("missing.toml"))
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, DaedalusConfig::default());
    }

    #[test]
    fn test_dotenv_file_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("daedalus.json");
        fs::write(&config_path, r#"{"service": {"debug": false}}"#).unwrap();

        let env_path = dir.path().join(".env");
        let mut env_file = fs::File::create(&env_path).unwrap();
        writeln!(env_file, "DDTEST__SERVICE__DEBUG=true").unwrap();
        writeln!(env_file, r#"DDTEST__CLIENT__HOSTS="https://a.example.com, https://b.example.com""#).unwrap();
        writeln!(env_file, "UNRELATED=1").unwrap();

        let config = ConfigLoader::new()
            .with_file(&config_path)
            .unwrap()
            .with_dotenv_file(&env_path)
            .unwrap()
            .with_env_prefix("DDTEST")
            .load()
            .unwrap();
        assert!(config.service.debug);
        assert_eq!(
            config.client.hosts,
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }

    #[test]
    fn test_parse_bool() {
        for value in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(value), Some(true));
        }
        for value in ["false", "0", "no", "Off"] {
            assert_eq!(parse_bool(value), Some(false));
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_apply_env_var_service() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVICE__IDENTITY_MODE", "yes", "TEST").unwrap();
        loader.apply_env_var("TEST__SERVICE__STATELESS", "false", "TEST").unwrap();
        loader.apply_env_var("TEST__SERVICE__CONTRACT_CACHE_TTL_SECS", "60", "TEST").unwrap();
        assert!(loader.config.service.identity_mode);
        assert_eq!(loader.config.service.stateless, Some(false));
        assert_eq!(loader.config.service.contract_cache_ttl_secs, 60);

        loader.apply_env_var("TEST__SERVICE__STATELESS", "none", "TEST").unwrap();
        assert_eq!(loader.config.service.stateless, None);
    }

    #[test]
    fn test_apply_env_var_telemetry() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__TELEMETRY__SERVICE_NAME", "users", "TEST").unwrap();
        loader.apply_env_var("TEST__TELEMETRY__LOGGING__FORMAT", "pretty", "TEST").unwrap();
        assert_eq!(loader.config.telemetry.service_name, "users");
        assert_eq!(loader.config.telemetry.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader.apply_env_var("TEST__SERVICE__DEBUG", "maybe", "TEST").is_err());
        assert!(loader.apply_env_var("TEST__CLIENT__TIMEOUT_MS", "soon", "TEST").is_err());
        assert!(loader.apply_env_var("TEST__TELEMETRY__LOGGING__FORMAT", "xml", "TEST").is_err());
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVICE__COLOR", "blue", "TEST").unwrap();
        assert_eq!(loader.config, DaedalusConfig::default());
    }
}
