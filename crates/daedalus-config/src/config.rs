//! Main configuration types.
//!
//! This module provides the top-level [`DaedalusConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ClientSection, ConfigError, LogFormat, ServiceSection, TelemetrySection};

/// Complete Daedalus configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use daedalus_config::DaedalusConfig;
///
/// let config = DaedalusConfig::default();
/// assert!(config.service.force_secure_connection);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DaedalusConfig {
    /// Dispatcher behaviour.
    #[serde(default)]
    pub service: ServiceSection,

    /// Logging.
    #[serde(default)]
    pub telemetry: TelemetrySection,

    /// Outbound client.
    #[serde(default)]
    pub client: ClientSection,
}

impl DaedalusConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::{DaedalusConfig, ServiceSection};
    ///
    /// let config = DaedalusConfig::builder()
    ///     .service(ServiceSection {
    ///         debug: true,
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert!(config.service.debug);
    /// ```
    #[must_use]
    pub fn builder() -> DaedalusConfigBuilder {
        DaedalusConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - the contract cache TTL is zero
    /// - the log level is empty
    /// - a client host is not an `http(s)` URL
    /// - the client timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.contract_cache_ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "service.contract_cache_ttl_secs",
                "must be greater than zero",
            ));
        }

        if self.telemetry.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                "must not be empty",
            ));
        }

        if let Some(host) = self
            .client
            .hosts
            .iter()
            .find(|h| !(h.starts_with("http://") || h.starts_with("https://")))
        {
            return Err(ConfigError::invalid_value(
                "client.hosts",
                format!("not an http(s) URL: {host}"),
            ));
        }

        if self.client.timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "client.timeout_ms",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Debug mode (contracts re-extracted, fault details shown)
    /// - Plain HTTP accepted
    /// - Pretty log formatting with ANSI colors at debug level
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::DaedalusConfig;
    ///
    /// let config = DaedalusConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// assert!(!config.service.force_secure_connection);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.service.debug = true;
        config.service.force_secure_connection = false;

        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.ansi_enabled = true;
        config.telemetry.logging.include_location = true;
        config.telemetry.environment = "development".to_string();

        config
    }

    /// Create a production configuration preset.
    ///
    /// - Secure channel required, empty bodies rejected
    /// - JSON log formatting at info level
    ///
    /// # Example
    ///
    /// ```
    /// use daedalus_config::DaedalusConfig;
    ///
    /// let config = DaedalusConfig::production();
    /// assert_eq!(config.telemetry.logging.format, daedalus_config::LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.service.debug = false;
        config.service.force_secure_connection = true;
        config.service.reject_empty_body = true;
        config.service.expose_internal_errors = false;

        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config.telemetry.logging.ansi_enabled = false;
        config.telemetry.environment = "production".to_string();

        config
    }
}

/// Builder for [`DaedalusConfig`].
#[derive(Debug, Default)]
pub struct DaedalusConfigBuilder {
    service: Option<ServiceSection>,
    telemetry: Option<TelemetrySection>,
    client: Option<ClientSection>,
}

impl DaedalusConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service section.
    #[must_use]
    pub fn service(mut self, service: ServiceSection) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetrySection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Set the client section.
    #[must_use]
    pub fn client(mut self, client: ClientSection) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the configuration; unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> DaedalusConfig {
        DaedalusConfig {
            service: self.service.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
            client: self.client.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<DaedalusConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
