//! # Daedalus
//!
//! **Contract-driven JSON RPC services**
//!
//! Daedalus turns the doc comments of a service's methods into enforced
//! contracts and generated documentation:
//!
//! - **Contracts from docs** – `@api`, `@param`, `@return`, `@permission`
//!   and friends are parsed once and cached
//! - **Fixed pipeline** – transport, contract, authorization and parameter
//!   checks run in an order that cannot be changed
//! - **One envelope** – every reply is `{"hasErrors", "errors", ...fields}`
//! - **Self-describing** – the default action returns the definition, the
//!   `documentation` action a plain-text page
//! - **Outbound client** – call a remote service with host failover
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use daedalus::prelude::*;
//!
//! /// Manages people.
//! #[service(crate = "::daedalus::core")]
//! pub struct PeopleService;
//!
//! #[rpc(crate = "::daedalus::core")]
//! impl PeopleService {
//!     /// Greets someone.
//!     /// @api
//!     /// @no-auth
//!     /// @param string name Who to greet {validate=notEmpty}
//!     /// @return string Greeting
//!     pub fn action_greet(&self, name: String) -> RpcResult<String> {
//!         Ok(format!("Hello, {name}"))
//!     }
//! }
//!
//! let config = ConfigLoader::new().with_defaults().with_env_prefix("DAEDALUS").load()?;
//! init_logging(&config.telemetry.log_config())?;
//!
//! let dispatcher = Dispatcher::builder(PeopleService).config(&config.service).build();
//! dispatcher.verify()?;
//! let response = dispatcher.dispatch(request);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! InboundCall → Bypass → Transport → Target → Body → Contract → Exposure
//!                                                                   ↓
//! Envelope ← after_call ← method ← Transaction ← Parameters ← Authorization
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use daedalus_core as core;

// Re-export the dispatcher
pub use daedalus_pipeline as pipeline;

// Re-export documentation types
pub use daedalus_docs as docs;

// Re-export configuration types
pub use daedalus_config as config;

// Re-export logging and metrics
pub use daedalus_telemetry as telemetry;

// Re-export the outbound client
pub use daedalus_client as client;

// Re-export macros
pub use daedalus_macros::{action, rpc, service};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use daedalus::prelude::*;
/// ```
pub mod prelude {
    pub use daedalus_core::{
        ActionObject, Authorizer, CallContext, CallerIdentity, ErrorCode, PermissionOracle, RpcError,
        RpcResult, RpcService, TransactionManager, Translator, ValidatorRegistry,
    };

    pub use daedalus_pipeline::{DispatchOptions, Dispatcher, Envelope, InboundCall, Reply};

    pub use daedalus_docs::{describe, render_docs, ServiceDefinition};

    pub use daedalus_config::{ConfigLoader, DaedalusConfig};

    pub use daedalus_telemetry::{init_logging, LogConfig};

    pub use daedalus_client::{ApiClient, ApiResult, AuthProvider};

    // Re-export the service macros
    pub use daedalus_macros::{action, rpc, service};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use daedalus_core::fixtures::UserDirectory;

    #[test]
    fn test_prelude_wires_a_dispatcher() {
        let dispatcher = Dispatcher::builder(UserDirectory::new()).build();
        let reply = dispatcher.handle(InboundCall::post("ping", ""));
        let envelope = reply.envelope().unwrap();
        assert!(!envelope.has_errors());
        assert_eq!(envelope.fields()["message"], serde_json::json!("pong"));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = DaedalusConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.client.user_agent, "FTS-API-Client");
    }
}
