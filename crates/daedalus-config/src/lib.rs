//! Typed configuration for Daedalus services.
//!
//! Configuration is layered: defaults (or a preset), then a TOML or JSON
//! file, then variables from a `.env` file, then the process environment.
//! Every section rejects unknown fields.
//!
//! - [`ServiceSection`] - dispatcher policy (secure channel, debug mode,
//!   statelessness, identity mode, contract cache lifetime)
//! - [`TelemetrySection`] - logging setup
//! - [`ClientSection`] - outbound client hosts and timeouts
//!
//! # Example
//!
//! ```no_run
//! use daedalus_config::{ConfigLoader, DaedalusConfig};
//!
//! # fn main() -> Result<(), daedalus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_production()
//!     .with_optional_file("daedalus.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("DAEDALUS")
//!     .load()?;
//!
//! println!("debug mode: {}", config.service.debug);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! force_secure_connection = true
//! debug = false
//! stateless = true
//! identity_mode = false
//! reject_empty_body = false
//! contract_cache_ttl_secs = 3600
//! expose_internal_errors = false
//!
//! [telemetry]
//! service_name = "user-directory"
//! environment = "production"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [client]
//! hosts = ["https://api-1.example.com", "https://api-2.example.com"]
//! api_path = "/api"
//! timeout_ms = 30000
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values are overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `DAEDALUS__SERVICE__DEBUG=true`
//! - `DAEDALUS__TELEMETRY__LOGGING__LEVEL=debug`
//! - `DAEDALUS__CLIENT__HOSTS=https://a.example.com,https://b.example.com`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
