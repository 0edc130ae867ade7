//! Named parameter validators.
//!
//! `@param` lines reference validators by name (`{validate=email}`). The
//! [`ValidatorRegistry`] maps those names to predicates; the dispatcher
//! verifies at startup that every referenced name is registered.
//!
//! Built-in validators:
//!
//! | Name | Accepts |
//! |---|---|
//! | `numeric` | numbers and numeric strings |
//! | `integer` | integers and integer strings |
//! | `boolean` | booleans, `0`/`1`, `"true"`/`"false"`/`"0"`/`"1"` |
//! | `string` | strings |
//! | `email` | strings shaped like `local@domain.tld` |
//! | `url` | `http://` and `https://` URLs |
//! | `notEmpty` | anything except `null`, `""`, `[]` and `{}` |
//! | `positive` | numbers and numeric strings greater than zero |

use crate::error::{RpcError, RpcResult};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// A validator predicate.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("invalid email regex: {e}"))
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/?#]+[^\s]*$").unwrap_or_else(|e| panic!("invalid url regex: {e}"))
});

/// Registry of named validators.
///
/// # Example
///
/// ```
/// use daedalus_core::ValidatorRegistry;
/// use serde_json::json;
///
/// let registry = ValidatorRegistry::with_builtins()
///     .register("even", |v| v.as_i64().is_some_and(|n| n % 2 == 0));
///
/// assert!(registry.validate("even", &json!(4)).unwrap());
/// assert!(!registry.validate("numeric", &json!("abc")).unwrap());
/// assert!(registry.validate("missing", &json!(1)).is_err());
/// ```
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, ValidatorFn>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in validators.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .register("numeric", |v| as_number(v).is_some())
            .register("integer", is_integer)
            .register("boolean", is_boolean)
            .register("string", Value::is_string)
            .register("email", |v| v.as_str().is_some_and(|s| EMAIL.is_match(s)))
            .register("url", |v| v.as_str().is_some_and(|s| URL.is_match(s)))
            .register("notEmpty", is_not_empty)
            .register("positive", |v| as_number(v).is_some_and(|n| n > 0.0))
    }

    /// Adds a validator, replacing any existing one with the same name.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.insert(name, validator);
        self
    }

    /// Adds a validator in place.
    pub fn insert<F>(&mut self, name: impl Into<String>, validator: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    /// Returns `true` if a validator with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Runs a validator.
    ///
    /// Fails with [`RpcError::ValidatorNotFound`] for unknown names.
    pub fn validate(&self, name: &str, value: &Value) -> RpcResult<bool> {
        let validator = self
            .validators
            .get(name)
            .ok_or_else(|| RpcError::ValidatorNotFound {
                validator: name.to_string(),
            })?;
        Ok(validator(value))
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.names())
            .finish()
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_u64(), Some(0 | 1)),
        Value::String(s) => matches!(s.as_str(), "true" | "false" | "0" | "1"),
        _ => false,
    }
}

fn is_not_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}
