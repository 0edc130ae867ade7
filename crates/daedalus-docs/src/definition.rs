//! Service definition generation.
//!
//! [`describe`] walks a service's attached actions and inline `action_*`
//! methods, extracts each contract through the shared
//! [`ContractCache`] and keeps the ones marked `@api`. Public fields and
//! associated constants are collected alongside.
//!
//! # Example
//!
//! ```
//! use daedalus_core::fixtures::UserDirectory;
//! use daedalus_core::{ActionMap, ContractCache};
//! use daedalus_docs::describe;
//!
//! let definition = describe(&UserDirectory::new(), &ActionMap::new(), &ContractCache::new()).unwrap();
//!
//! let methods: Vec<_> = definition.methods.keys().cloned().collect();
//! assert_eq!(methods, ["delete-user", "find-users", "get-user"]);
//! assert_eq!(definition.short_name, "UserDirectory");
//! ```

use crate::error::{DocsError, DocsResult};
use crate::scan::scan_error_codes;
use daedalus_core::extract::property_doc;
use daedalus_core::service::MethodDescriptor;
use daedalus_core::{ActionMap, ContractCache, MethodContract, RpcError, RpcService};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A snapshot of everything a service exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    /// `@api` contracts keyed by action id, in lexicographic order.
    pub methods: BTreeMap<String, MethodContract>,
    /// Fully qualified type name.
    pub name: String,
    /// Type name without the module path.
    pub short_name: String,
    /// Module path.
    pub namespace: String,
    /// Source file of the service type.
    pub source_location: String,
    /// Route prefix of the service.
    pub base_route: String,
    /// Doc comment of the service type.
    pub description: Option<String>,
    /// Public fields in declaration order.
    pub properties: IndexMap<String, PropertyDefinition>,
    /// Associated constants in declaration order.
    pub constants: IndexMap<String, Value>,
    /// Custom error codes raised in the service source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_codes: Vec<String>,
}

impl ServiceDefinition {
    /// Returns `true` if the service authenticates without a session.
    #[must_use]
    pub fn is_stateless(&self) -> bool {
        self.properties
            .get("stateless")
            .and_then(|p| p.value.as_ref())
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Returns the `{"methods": {...}}` document of the definition endpoint.
    pub fn methods_document(&self) -> DocsResult<Value> {
        Ok(json!({ "methods": serde_json::to_value(&self.methods)? }))
    }
}

/// A public field of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Type from `@var`, or the Rust type.
    #[serde(rename = "type")]
    pub ty: String,
    /// Free text of the field's doc.
    pub description: String,
    /// Current value of the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Describes a service with its attached actions.
///
/// Attached actions shadow inline methods with the same id. Methods
/// without any doc comment are skipped since they cannot be `@api`.
///
/// # Errors
///
/// Returns [`DocsError::InvalidOperation`] for an attached action without
/// a public `run` entry point, and [`DocsError::Contract`] when a doc
/// comment does not match its signature.
pub fn describe<S>(service: &S, actions: &ActionMap, cache: &ContractCache) -> DocsResult<ServiceDefinition>
where
    S: RpcService + ?Sized,
{
    let info = service.service_info();
    let mut methods = BTreeMap::new();

    for (id, action) in actions {
        let entry = action
            .entry()
            .filter(|entry| entry.public)
            .ok_or_else(|| DocsError::InvalidOperation {
                operation_id: id.clone(),
                reason: "attached action has no public run method".to_string(),
            })?;
        if let Some(contract) = api_contract(cache, action.type_name(), id, &entry)? {
            methods.insert(id.clone(), contract);
        }
    }

    for method in service.methods() {
        let Some(id) = method.route_id() else {
            continue;
        };
        if !method.public || actions.contains_key(&id) {
            continue;
        }
        if let Some(contract) = api_contract(cache, &info.name, &id, &method)? {
            methods.insert(id, contract);
        }
    }

    let properties = service
        .properties()
        .into_iter()
        .map(|property| {
            let (ty, description) = property_doc(property.doc, property.rust_type);
            (
                property.name.to_string(),
                PropertyDefinition {
                    ty,
                    description,
                    value: property.value,
                },
            )
        })
        .collect();

    let constants = service
        .constants()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    tracing::debug!(service = %info.name, methods = methods.len(), "service described");

    Ok(ServiceDefinition {
        methods,
        name: info.name,
        short_name: info.short_name.to_string(),
        namespace: info.namespace.to_string(),
        source_location: info.source_location.to_string(),
        base_route: info.base_route,
        description: info.description.map(str::to_string),
        properties,
        constants,
        error_codes: scan_error_codes(service.source_text()),
    })
}

fn api_contract(
    cache: &ContractCache,
    type_id: &str,
    id: &str,
    method: &MethodDescriptor,
) -> DocsResult<Option<MethodContract>> {
    match cache.resolve_method(type_id, method) {
        Ok(contract) if contract.requires_api => Ok(Some((*contract).clone())),
        Ok(_) | Err(RpcError::NoDocumentation { .. }) => Ok(None),
        Err(source) => Err(DocsError::Contract {
            method: id.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::fixtures::UserDirectory;
    use daedalus_core::service::{ActionObject, Arguments, ParamDescriptor};
    use daedalus_core::{CallContext, RpcResult};
    use std::sync::Arc;

    struct Export {
        public: bool,
    }

    impl ActionObject for Export {
        fn type_name(&self) -> &'static str {
            "tests::Export"
        }

        fn entry(&self) -> Option<MethodDescriptor> {
            Some(
                MethodDescriptor::new(
                    "run",
                    Some("Exports users.\n@api\n@param string format Output format\n@return array Export"),
                    vec![ParamDescriptor::required("format")],
                )
                .public(self.public),
            )
        }

        fn run(&self, _ctx: &mut CallContext, _args: &mut Arguments) -> RpcResult<Value> {
            Ok(json!({"rows": 0}))
        }
    }

    fn actions(public: bool) -> ActionMap {
        let mut actions = ActionMap::new();
        actions.insert("export".to_string(), Arc::new(Export { public }) as Arc<dyn ActionObject>);
        actions
    }

    #[test]
    fn test_describe_keeps_api_methods_only() {
        let definition = describe(&UserDirectory::new(), &ActionMap::new(), &ContractCache::new()).unwrap();
        assert!(!definition.methods.contains_key("stats"));
        assert_eq!(definition.methods.len(), 3);
        assert_eq!(definition.base_route, "/user-directory");
        assert_eq!(definition.constants["MAX_PAGE"], json!(100));
        assert_eq!(definition.error_codes, ["USER_NOT_FOUND", "USER_PROTECTED"]);
    }

    #[test]
    fn test_describe_properties() {
        let definition = describe(
            &UserDirectory::new().stateless(true),
            &ActionMap::new(),
            &ContractCache::new(),
        )
        .unwrap();
        let stateless = &definition.properties["stateless"];
        assert_eq!(stateless.ty, "bool");
        assert_eq!(stateless.description, "Whether callers authenticate without a session");
        assert_eq!(stateless.value, Some(Value::Bool(true)));
        assert!(definition.is_stateless());
    }

    #[test]
    fn test_describe_attached_action() {
        let definition = describe(&UserDirectory::new(), &actions(true), &ContractCache::new()).unwrap();
        let keys: Vec<_> = definition.methods.keys().map(String::as_str).collect();
        assert_eq!(keys, ["delete-user", "export", "find-users", "get-user"]);
        assert_eq!(definition.methods["export"].name, "run");
    }

    #[test]
    fn test_describe_rejects_private_run() {
        let err = describe(&UserDirectory::new(), &actions(false), &ContractCache::new()).unwrap_err();
        assert!(matches!(err, DocsError::InvalidOperation { ref operation_id, .. } if operation_id == "export"));
    }

    #[test]
    fn test_describe_is_idempotent() {
        let cache = ContractCache::new();
        let service = UserDirectory::new();
        let first = describe(&service, &ActionMap::new(), &cache).unwrap();
        let second = describe(&service, &ActionMap::new(), &cache).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_methods_document() {
        let definition = describe(&UserDirectory::new(), &ActionMap::new(), &ContractCache::new()).unwrap();
        let document = definition.methods_document().unwrap();
        let get_user = &document["methods"]["get-user"];
        assert_eq!(get_user["requiresApi"], json!(true));
        assert_eq!(get_user["params"]["userId"]["validatorName"], json!("positive"));
        assert_eq!(get_user["return"]["type"], json!("array"));
        assert!(document.get("name").is_none());
    }
}
