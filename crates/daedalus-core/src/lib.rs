//! # Daedalus Core
//!
//! Core types and traits for the Daedalus RPC framework.
//!
//! This crate provides the foundational types used throughout Daedalus:
//!
//! - [`MethodContract`] - Normalized contract of a callable method
//! - [`extract::extract_contract`] - Builds contracts from structured doc comments
//! - [`cache::ContractCache`] - TTL cache of extracted contracts
//! - [`CallContext`] - Per-call state: input, errors, identity, transaction
//! - [`RpcError`] - The error taxonomy surfaced in response envelopes
//! - [`ValidatorRegistry`] - Named parameter validators
//! - [`service`] - Descriptor traits generated by `daedalus-macros`

#![doc(html_root_url = "https://docs.rs/daedalus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cache;
mod context;
pub mod contract;
mod error;
pub mod extract;
pub mod fixtures;
pub mod i18n;
mod identity;
pub mod naming;
pub mod service;
mod transaction;
mod validator;
pub mod value;

pub use cache::{ContractCache, ContractCacheBackend, MemoryContractCache, CONTRACT_TTL};
pub use context::{CallContext, RequestContext, RequestId};
pub use contract::{ElementSpec, MethodContract, ParamSpec, ReturnSpec};
pub use error::{ErrorCategory, ErrorCode, ErrorEntry, RpcError, RpcResult};
pub use i18n::{Catalog, PassthroughTranslator, Translator};
pub use identity::{
    AllowAll, Authorizer, CallerIdentity, DenyAll, FnAuthorizer, IdentityPermissions,
    PermissionOracle, WILDCARD_PERMISSION,
};
pub use service::{
    ActionMap, ActionObject, Arguments, IntoRpcValue, MethodDescriptor, ParamDescriptor, PropertyDescriptor,
    RpcMethods, RpcService, ServiceInfo, ServiceMeta,
};
pub use transaction::{TransactionManager, TransactionSlot};
pub use validator::{ValidatorFn, ValidatorRegistry};

/// Re-exports used by code generated in `daedalus-macros`.
#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
