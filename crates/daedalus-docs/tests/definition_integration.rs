//! Definitions and documentation built from a contract cache shared across calls.

use daedalus_core::fixtures::UserDirectory;
use daedalus_core::service::{ActionObject, Arguments, MethodDescriptor, ParamDescriptor};
use daedalus_core::{ActionMap, CallContext, ContractCache, RpcResult};
use daedalus_docs::{describe, render_docs, DocsError};
use serde_json::{json, Value};
use std::sync::Arc;

/// An attached action whose doc comment names the wrong parameter.
struct Broken;

impl ActionObject for Broken {
    fn type_name(&self) -> &'static str {
        "definition_integration::Broken"
    }

    fn entry(&self) -> Option<MethodDescriptor> {
        Some(MethodDescriptor::new(
            "run",
            Some("@api\n@param int id Identifier"),
            vec![ParamDescriptor::required("userId")],
        ))
    }

    fn run(&self, _ctx: &mut CallContext, _args: &mut Arguments) -> RpcResult<Value> {
        Ok(json!({}))
    }
}

/// An attached action without a `run` entry point.
struct Empty;

impl ActionObject for Empty {
    fn type_name(&self) -> &'static str {
        "definition_integration::Empty"
    }

    fn entry(&self) -> Option<MethodDescriptor> {
        None
    }

    fn run(&self, ctx: &mut CallContext, _args: &mut Arguments) -> RpcResult<Value> {
        Err(daedalus_core::RpcError::NoRunMethod {
            action: ctx.action().to_string(),
        })
    }
}

fn attach(id: &str, action: impl ActionObject + 'static) -> ActionMap {
    let mut actions = ActionMap::new();
    actions.insert(id.to_string(), Arc::new(action));
    actions
}

#[test]
fn mismatched_attached_action_fails_loudly() {
    let err = describe(&UserDirectory::new(), &attach("broken", Broken), &ContractCache::new()).unwrap_err();
    match err {
        DocsError::Contract { method, source } => {
            assert_eq!(method, "broken");
            assert_eq!(source.code(), "ContractMismatch");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn action_without_run_is_invalid() {
    let err = describe(&UserDirectory::new(), &attach("empty", Empty), &ContractCache::new()).unwrap_err();
    assert!(matches!(err, DocsError::InvalidOperation { .. }));
}

#[test]
fn debug_cache_produces_the_same_definition() {
    let service = UserDirectory::new();
    let cached = describe(&service, &ActionMap::new(), &ContractCache::new()).unwrap();
    let debug = describe(&service, &ActionMap::new(), &ContractCache::new().with_debug(true)).unwrap();
    assert_eq!(cached, debug);
    assert_eq!(render_docs(&cached), render_docs(&debug));
}

#[test]
fn definition_serializes_in_camel_case() {
    let definition = describe(&UserDirectory::new(), &ActionMap::new(), &ContractCache::new()).unwrap();
    let value = serde_json::to_value(&definition).unwrap();
    assert_eq!(value["shortName"], json!("UserDirectory"));
    assert_eq!(value["baseRoute"], json!("/user-directory"));
    assert_eq!(value["properties"]["stateless"]["type"], json!("bool"));
    assert_eq!(value["methods"]["find-users"]["permission"], json!("users.read"));
    assert_eq!(value["methods"]["delete-user"]["requiresTransaction"], json!(true));
}
