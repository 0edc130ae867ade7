//! Built-in `ping` action.
//!
//! Every dispatcher answers `ping` unless the service defines its own, so
//! clients can check availability without credentials.

use daedalus_core::service::{ActionObject, Arguments, MethodDescriptor};
use daedalus_core::{CallContext, RpcResult};
use serde_json::{json, Value};

/// Action id of the built-in ping.
pub const PING_ACTION: &str = "ping";

const PING_DOC: &str = "Checks that the API is reachable.
@api
@no-auth
@return array
@return-element string message Reply message";

/// Replies `{"message": "pong"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingAction;

impl ActionObject for PingAction {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn entry(&self) -> Option<MethodDescriptor> {
        Some(MethodDescriptor::new("run", Some(PING_DOC), Vec::new()))
    }

    fn run(&self, _ctx: &mut CallContext, _args: &mut Arguments) -> RpcResult<Value> {
        Ok(json!({"message": "pong"}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_contract() {
        let contract = PingAction.entry().unwrap().extract_contract().unwrap();
        assert!(contract.requires_api);
        assert!(!contract.requires_auth);
        assert_eq!(contract.declared_return_type().as_deref(), Some("array"));
        assert_eq!(contract.return_params["message"].ty, "string");
    }
}
