//! Procedural macros for Daedalus services.
//!
//! These macros capture, at build time, the metadata the runtime contract
//! extractor needs: raw doc comments, declared parameter names, defaults,
//! visibility, public fields and associated constants.
//!
//! # Example
//!
//! ```rust,ignore
//! use daedalus::prelude::*;
//!
//! /// Manages users.
//! #[daedalus::service(route = "/users")]
//! pub struct UserService {
//!     /// @var bool Whether callers authenticate without a session
//!     pub stateless: bool,
//! }
//!
//! #[daedalus::rpc]
//! impl UserService {
//!     /// Returns a user.
//!     /// @api
//!     /// @param int userId Identifier of the user {validate=positive}
//!     /// @return array The user
//!     pub fn action_get_user(&self, user_id: i64) -> RpcResult<User> {
//!         self.repo.find(user_id).ok_or_else(|| RpcError::custom("USER_NOT_FOUND", "User not found"))
//!     }
//! }
//! ```
//!
//! # Generated code
//!
//! - `#[service]` implements `ServiceMeta` (identity, route, properties)
//! - `#[rpc]` implements `RpcMethods` (descriptors, invoker, constants, source text)
//! - `#[action]` implements `ActionObject` for an attached action's `run`
//!
//! Generated code refers to `::daedalus_core`. Pass `crate = "path"` to any
//! of the macros when the core crate is reachable under another path.

mod parse;
mod rpc;
mod service;

use proc_macro::TokenStream;

/// Marks a struct as a Daedalus service.
///
/// # Attributes
///
/// - `route`: route prefix (optional, defaults to the dash-cased type name
///   without a `Service`/`Controller`/`Api` suffix)
/// - `crate`: path of the core crate (optional)
///
/// Public fields are exported as properties and must implement
/// `serde::Serialize`; exclude one with `#[property(skip)]`.
#[proc_macro_attribute]
pub fn service(attr: TokenStream, item: TokenStream) -> TokenStream {
    service::expand_service(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Collects the `action_*` methods of an impl block.
///
/// Each action method takes `&self`, optionally a `&CallContext` or
/// `&mut CallContext`, and request parameters whose types implement
/// `serde::de::DeserializeOwned`. Parameters of type `Option<T>` or
/// annotated `#[default(expr)]` are optional. The return type must be a
/// `Result<T, E>` with `T: Serialize` and `E: Into<RpcError>`.
#[proc_macro_attribute]
pub fn rpc(attr: TokenStream, item: TokenStream) -> TokenStream {
    rpc::expand_rpc(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Marks the impl block of an attached action.
///
/// The action's entry point is its `run` method, following the same
/// parameter rules as `#[rpc]` methods. Without a `run` method every call
/// fails with `NoRunMethod`.
#[proc_macro_attribute]
pub fn action(attr: TokenStream, item: TokenStream) -> TokenStream {
    rpc::expand_action(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
