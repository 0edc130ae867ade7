//! Method contract types.
//!
//! A [`MethodContract`] is the normalized form of a method's documentation
//! comment combined with its declared signature. It drives exposure,
//! authorization, validation and output checks for every call, and is
//! exported verbatim by the definition endpoint.
//!
//! Contracts are built by [`crate::extract::extract_contract`] and shared
//! through the [`crate::cache::ContractCache`].
//!
//! # Example
//!
//! ```
//! use daedalus_core::extract::extract_contract;
//! use daedalus_core::service::ParamDescriptor;
//!
//! let doc = "Returns a user.\n@api\n@param int userId User id {validate=positive}\n@return array The user";
//! let params = [ParamDescriptor::required("userId")];
//! let contract = extract_contract("action_get_user", Some(doc), &params).unwrap();
//!
//! assert!(contract.requires_api);
//! assert!(contract.requires_auth);
//! assert_eq!(contract.params["userId"].validator.as_deref(), Some("positive"));
//! assert_eq!(contract.declared_return_type().as_deref(), Some("array"));
//! ```

use crate::value::canonical_type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The contract of one callable method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodContract {
    /// Rust name of the method (`action_get_user` or `run`).
    pub name: String,
    /// Free text preceding the first tag.
    pub description: Option<String>,
    /// Documented parameters in declaration order, keyed by wire name.
    pub params: IndexMap<String, ParamSpec>,
    /// Documented return value.
    #[serde(rename = "return")]
    pub returns: ReturnSpec,
    /// Documented fields of a structured return value.
    pub return_params: IndexMap<String, ElementSpec>,
    /// `@api`: exposed through the API.
    pub requires_api: bool,
    /// Inverse of `@no-auth`.
    pub requires_auth: bool,
    /// `@permission` name, if any.
    pub permission: Option<String>,
    /// `@transaction`: runs inside a transaction.
    pub requires_transaction: bool,
}

impl MethodContract {
    /// Creates an empty contract: not exposed, authenticated, no params.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: IndexMap::new(),
            returns: ReturnSpec::default(),
            return_params: IndexMap::new(),
            requires_api: false,
            requires_auth: true,
            permission: None,
            requires_transaction: false,
        }
    }

    /// Returns the canonical documented return type.
    ///
    /// `None` when no `@return` line was given or it declares `mixed`.
    #[must_use]
    pub fn declared_return_type(&self) -> Option<String> {
        self.returns.ty.as_deref().and_then(canonical_type)
    }

    /// Iterates over `(param, validator)` pairs.
    pub fn validators(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().filter_map(|(name, spec)| {
            spec.validator
                .as_deref()
                .map(|validator| (name.as_str(), validator))
        })
    }
}

/// One documented parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    /// Documented type name.
    #[serde(rename = "type")]
    pub ty: String,
    /// Free text of the `@param` line.
    pub description: String,
    /// `true` unless the signature makes the parameter optional.
    pub required: bool,
    /// Default value from the signature.
    pub default: Option<Value>,
    /// Name of the validator from `{validate=...}`.
    #[serde(rename = "validatorName", skip_serializing_if = "Option::is_none", default)]
    pub validator: Option<String>,
    /// Shapes of nested elements from `{element=...}`.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub elements: IndexMap<String, ElementSpec>,
}

/// Type and description of a nested element or return field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Documented type name.
    #[serde(rename = "type")]
    pub ty: String,
    /// Free text.
    pub description: String,
}

impl ElementSpec {
    /// Creates an element shape.
    #[must_use]
    pub fn new(ty: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            description: description.into(),
        }
    }
}

/// The documented return value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnSpec {
    /// Documented type name, `None` when no `@return` line exists.
    #[serde(rename = "type")]
    pub ty: Option<String>,
    /// Free text of the `@return` line.
    pub description: String,
}
