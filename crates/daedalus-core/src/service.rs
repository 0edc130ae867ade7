//! Service descriptors.
//!
//! The `#[service]` and `#[rpc]` attribute macros capture, at build time,
//! everything the runtime needs to know about a service: its raw doc
//! comments, declared parameter names, defaults, public fields and
//! constants. The runtime extractor turns these descriptors into
//! [`MethodContract`](crate::MethodContract)s on first use.
//!
//! Two shapes of callable exist:
//!
//! - inline methods named `action_<name>` on the service itself, invoked
//!   through [`RpcMethods::invoke`]
//! - attached actions: separate objects implementing [`ActionObject`] with a
//!   single `run` entry point
//!
//! # Example
//!
//! ```
//! use daedalus_core::service::{MethodDescriptor, ParamDescriptor};
//!
//! let method = MethodDescriptor::new(
//!     "action_get_user",
//!     Some("@api\n@param int userId User id"),
//!     vec![ParamDescriptor::required("userId")],
//! );
//! assert_eq!(method.route_id().as_deref(), Some("get-user"));
//! assert!(method.extract_contract().unwrap().requires_api);
//! ```

use crate::context::CallContext;
use crate::contract::MethodContract;
use crate::error::{RpcError, RpcResult};
use crate::extract::extract_contract;
use crate::naming::method_to_route;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A declared parameter of a callable.
#[derive(Debug, Clone, Copy)]
pub struct ParamDescriptor {
    /// Wire name (camelCase of the Rust identifier).
    pub name: &'static str,
    /// `Option<T>` parameter: absent means `null`.
    pub optional: bool,
    /// Producer of the `#[default(expr)]` value.
    pub default: Option<fn() -> Value>,
}

impl ParamDescriptor {
    /// A parameter that must be present in the request.
    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            optional: false,
            default: None,
        }
    }

    /// An `Option<T>` parameter.
    #[must_use]
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            optional: true,
            default: None,
        }
    }

    /// A parameter with a default value.
    #[must_use]
    pub const fn with_default(name: &'static str, default: fn() -> Value) -> Self {
        Self {
            name,
            optional: false,
            default: Some(default),
        }
    }

    /// Returns `true` if the request must carry the parameter.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }

    /// Returns the value bound when the parameter is absent.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        match self.default {
            Some(default) => Some(default()),
            None if self.optional => Some(Value::Null),
            None => None,
        }
    }
}

/// A callable method as captured at build time.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    /// Rust name of the method.
    pub name: &'static str,
    /// Raw doc comment text, `None` if the method has none.
    pub doc: Option<&'static str>,
    /// Declared parameters in order, excluding the call context.
    pub params: Vec<ParamDescriptor>,
    /// Whether the method is declared `pub`.
    pub public: bool,
}

impl MethodDescriptor {
    /// Creates a public method descriptor.
    #[must_use]
    pub fn new(name: &'static str, doc: Option<&'static str>, params: Vec<ParamDescriptor>) -> Self {
        Self {
            name,
            doc,
            params,
            public: true,
        }
    }

    /// Sets the visibility.
    #[must_use]
    pub const fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    /// Returns the dash-case route id of an `action_*` method.
    #[must_use]
    pub fn route_id(&self) -> Option<String> {
        method_to_route(self.name)
    }

    /// Parses the doc comment into a contract.
    pub fn extract_contract(&self) -> RpcResult<MethodContract> {
        extract_contract(self.name, self.doc, &self.params)
    }
}

/// A public struct field of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Field name.
    pub name: &'static str,
    /// Declared Rust type, as written.
    pub rust_type: &'static str,
    /// Raw doc comment text.
    pub doc: Option<&'static str>,
    /// Current value, if it serializes.
    pub value: Option<Value>,
}

/// Static identity of a service type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Fully qualified type name.
    pub name: String,
    /// Type name without the module path.
    pub short_name: &'static str,
    /// Module path.
    pub namespace: &'static str,
    /// Source file the type is declared in.
    pub source_location: &'static str,
    /// Route prefix under which the service is mounted.
    pub base_route: String,
    /// Doc comment of the type.
    pub description: Option<&'static str>,
}

impl ServiceInfo {
    /// Creates service info; the full name is `namespace::short_name`.
    #[must_use]
    pub fn new(
        short_name: &'static str,
        namespace: &'static str,
        source_location: &'static str,
        base_route: impl Into<String>,
        description: Option<&'static str>,
    ) -> Self {
        Self {
            name: format!("{namespace}::{short_name}"),
            short_name,
            namespace,
            source_location,
            base_route: base_route.into(),
            description,
        }
    }
}

/// Metadata of a service struct. Generated by `#[service]`.
pub trait ServiceMeta {
    /// Returns the static identity of the service.
    fn service_info(&self) -> ServiceInfo;

    /// Returns public fields with their current values.
    fn properties(&self) -> Vec<PropertyDescriptor>;

    /// Returns the value of the `stateless` property, `false` if absent.
    fn is_stateless(&self) -> bool {
        self.properties()
            .iter()
            .find(|p| p.name == "stateless")
            .and_then(|p| p.value.as_ref())
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Inline methods of a service. Generated by `#[rpc]`.
pub trait RpcMethods {
    /// Returns all `action_*` methods.
    fn methods(&self) -> Vec<MethodDescriptor>;

    /// Invokes an inline method by Rust name with bound arguments.
    fn invoke(&self, method: &str, ctx: &mut CallContext, args: &mut Arguments) -> RpcResult<Value>;

    /// Returns associated constants with their values.
    fn constants(&self) -> Vec<(&'static str, Value)>;

    /// Returns the source text of the `#[rpc]` impl block.
    fn source_text(&self) -> &'static str;

    /// Looks up an inline method by Rust name.
    fn method(&self, name: &str) -> Option<MethodDescriptor> {
        self.methods().into_iter().find(|m| m.name == name)
    }
}

/// A service that can be dispatched.
pub trait RpcService: ServiceMeta + RpcMethods + Send + Sync + 'static {}

impl<T> RpcService for T where T: ServiceMeta + RpcMethods + Send + Sync + 'static {}

/// An externally attached action with a single `run` entry point.
///
/// Generated by `#[action]` on the action's impl block.
pub trait ActionObject: Send + Sync {
    /// Rust type name of the action.
    fn type_name(&self) -> &'static str;

    /// Returns the `run` entry point, `None` if the type declares none.
    fn entry(&self) -> Option<MethodDescriptor>;

    /// Invokes the entry point.
    fn run(&self, ctx: &mut CallContext, args: &mut Arguments) -> RpcResult<Value>;
}

/// Attached actions keyed by action id.
pub type ActionMap = BTreeMap<String, Arc<dyn ActionObject>>;

/// Bound call arguments.
///
/// Built from the positional route arguments overlaid with the validated
/// body values; consumed by the generated invoker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates arguments from a map.
    #[must_use]
    pub const fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Binds a value, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Returns a bound value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Removes and decodes a value, falling back to `default` when absent.
    ///
    /// Validators accept scalars sent as strings (`"12"`, `"true"`) and
    /// `0`/`1` as booleans, so those forms are decoded too. A value that
    /// still does not decode into `T` is a [`RpcError::ParamNotValid`] with
    /// validator `type`.
    pub fn take<T: DeserializeOwned>(&mut self, name: &str, default: Option<Value>) -> RpcResult<T> {
        let value = self
            .values
            .remove(name)
            .or(default)
            .unwrap_or(Value::Null);
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Ok(decoded),
            Err(e) => loose_forms(&value)
                .into_iter()
                .find_map(|candidate| serde_json::from_value(candidate).ok())
                .ok_or_else(|| {
                    tracing::debug!(param = name, error = %e, "argument does not decode into declared type");
                    RpcError::ParamNotValid {
                        param: name.to_string(),
                        validator: "type".to_string(),
                    }
                }),
        }
    }
}

/// Alternative readings of a scalar: the JSON scalar inside a string, and
/// the boolean behind `0`/`1`.
fn loose_forms(value: &Value) -> Vec<Value> {
    let scalar = match value {
        Value::String(text) => match serde_json::from_str::<Value>(text.trim()) {
            Ok(parsed @ (Value::Number(_) | Value::Bool(_))) => parsed,
            _ => return Vec::new(),
        },
        Value::Number(_) => value.clone(),
        _ => return Vec::new(),
    };

    let mut forms = Vec::with_capacity(2);
    match scalar.as_i64() {
        Some(0) => forms.push(Value::Bool(false)),
        Some(1) => forms.push(Value::Bool(true)),
        _ => {}
    }
    if value.is_string() {
        forms.insert(0, scalar);
    }
    forms
}

/// Conversion of a method's return value into the raw call result.
pub trait IntoRpcValue {
    /// Serializes the value or propagates the error.
    fn into_rpc_value(self) -> RpcResult<Value>;
}

impl<T, E> IntoRpcValue for Result<T, E>
where
    T: Serialize,
    E: Into<RpcError>,
{
    fn into_rpc_value(self) -> RpcResult<Value> {
        let value = self.map_err(Into::into)?;
        serde_json::to_value(value)
            .map_err(|e| RpcError::internal_with_source("failed to serialize method result", e))
    }
}
