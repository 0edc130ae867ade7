//! Response normalization.
//!
//! After the method returns, its raw result is checked against the
//! documented return type, coerced for truthiness and reduced to the
//! fields merged into the envelope. The transaction opened by the call is
//! committed here, or rolled back if a warning was recorded.

use daedalus_core::value::{coerce, Coerced, RuntimeType};
use daedalus_core::{CallContext, MethodContract, RpcError, RpcResult};
use serde_json::{Map, Value};

/// Normalizes a raw method result into envelope fields.
///
/// # Errors
///
/// - [`RpcError::ReturnTypeMismatch`] when the runtime type differs from the
///   documented one
/// - [`RpcError::ReturnTypeNotSupported`] for `null`
/// - [`RpcError::ReturnValueFalse`] for a falsy scalar
/// - the commit failure of a transaction opened by this call
pub fn after_call(
    contract: &MethodContract,
    raw: Value,
    ctx: &mut CallContext,
) -> RpcResult<Map<String, Value>> {
    let fields = result_fields(contract, raw)?;
    if ctx.has_errors() {
        ctx.transaction_mut().rollback();
    } else {
        ctx.transaction_mut().commit()?;
    }
    Ok(fields)
}

/// Checks and coerces a raw result without touching the transaction.
pub fn result_fields(contract: &MethodContract, raw: Value) -> RpcResult<Map<String, Value>> {
    let actual = RuntimeType::of(&raw);
    if let Some(declared) = contract.declared_return_type() {
        if declared != actual.as_str() {
            return Err(RpcError::ReturnTypeMismatch {
                declared,
                actual: actual.as_str().to_string(),
            });
        }
    }

    match coerce(raw)? {
        Coerced::Scalar(false) => Err(RpcError::ReturnValueFalse),
        Coerced::Scalar(true) => Ok(Map::new()),
        Coerced::Structured(Value::Object(fields)) => Ok(fields),
        // Lists merge by position.
        Coerced::Structured(Value::Array(items)) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect()),
        Coerced::Structured(other) => Err(RpcError::ReturnTypeNotSupported {
            actual: RuntimeType::of(&other).as_str().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::fixtures::InMemoryTransactions;
    use daedalus_core::{ReturnSpec, TransactionSlot};
    use serde_json::json;
    use std::sync::Arc;

    fn returning(ty: Option<&str>) -> MethodContract {
        let mut contract = MethodContract::new("action_x");
        contract.returns = ReturnSpec {
            ty: ty.map(str::to_string),
            description: String::new(),
        };
        contract
    }

    #[test]
    fn test_structured_result_passes_through() {
        let fields = result_fields(&returning(Some("array")), json!({"id": 1})).unwrap();
        assert_eq!(Value::Object(fields), json!({"id": 1}));
    }

    #[test]
    fn test_list_merges_by_position() {
        let fields = result_fields(&returning(Some("list")), json!(["a", "b"])).unwrap();
        assert_eq!(Value::Object(fields), json!({"0": "a", "1": "b"}));
    }

    #[test]
    fn test_truthy_scalar_has_no_fields() {
        assert!(result_fields(&returning(Some("bool")), json!(true)).unwrap().is_empty());
        assert!(result_fields(&returning(Some("string")), json!("12abc")).unwrap().is_empty());
        assert!(result_fields(&returning(None), json!(1.5)).unwrap().is_empty());
    }

    #[test]
    fn test_falsy_scalars() {
        for raw in [json!(false), json!(0), json!(0.7), json!("abc"), json!("0")] {
            let err = result_fields(&returning(Some("mixed")), raw).unwrap_err();
            assert!(matches!(err, RpcError::ReturnValueFalse));
        }
    }

    #[test]
    fn test_type_mismatch_names_both_types() {
        let err = result_fields(&returning(Some("int")), json!("5")).unwrap_err();
        match err {
            RpcError::ReturnTypeMismatch { declared, actual } => {
                assert_eq!(declared, "integer");
                assert_eq!(actual, "string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_null_not_supported() {
        let err = result_fields(&returning(None), Value::Null).unwrap_err();
        assert!(matches!(err, RpcError::ReturnTypeNotSupported { .. }));
    }

    proptest::proptest! {
        #[test]
        fn integer_truthiness(n in proptest::num::i64::ANY) {
            let result = result_fields(&returning(Some("int")), json!(n));
            proptest::prop_assert_eq!(result.is_ok(), n != 0);
        }

        #[test]
        fn object_fields_kept(keys in proptest::collection::btree_set("[a-z]{1,8}", 0..6)) {
            let raw: Map<String, Value> = keys.iter().map(|k| (k.clone(), json!(1))).collect();
            let fields = result_fields(&returning(Some("array")), Value::Object(raw.clone())).unwrap();
            proptest::prop_assert_eq!(fields, raw);
        }
    }

    #[test]
    fn test_after_call_commits_own_transaction() {
        let manager = Arc::new(InMemoryTransactions::new());
        let mut ctx = CallContext::new("x").with_transaction(TransactionSlot::new(manager.clone()));
        ctx.transaction_mut().acquire().unwrap();
        after_call(&returning(Some("bool")), json!(true), &mut ctx).unwrap();
        assert_eq!(manager.commits(), 1);
        assert!(!ctx.transaction().is_active());
    }

    #[test]
    fn test_after_call_rolls_back_on_warning() {
        let manager = Arc::new(InMemoryTransactions::new());
        let mut ctx = CallContext::new("x").with_transaction(TransactionSlot::new(manager.clone()));
        ctx.transaction_mut().acquire().unwrap();
        ctx.add_warning("Partial result", "PARTIAL");
        after_call(&returning(None), json!({"n": 1}), &mut ctx).unwrap();
        assert_eq!((manager.commits(), manager.rollbacks()), (0, 1));
    }
}
