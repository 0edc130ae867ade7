//! Runtime typing and truthiness of method results.
//!
//! The documented return type of a method is checked against the runtime
//! type of the value the method produced. Type names follow the contract
//! vocabulary: `boolean`, `integer`, `double`, `string`, `array`, `null`.

use crate::error::{RpcError, RpcResult};
use serde_json::Value;

/// Runtime type of a JSON value in contract vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeType {
    /// `true` / `false`.
    Boolean,
    /// A number without a fractional part.
    Integer,
    /// A floating point number.
    Double,
    /// A string.
    String,
    /// A JSON array or object.
    Array,
    /// `null`.
    Null,
}

impl RuntimeType {
    /// Returns the runtime type of `value`.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Double,
            Value::String(_) => Self::String,
            Value::Array(_) | Value::Object(_) => Self::Array,
        }
    }

    /// Returns the contract name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::Array => "array",
            Self::Null => "null",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonicalizes a documented type name.
///
/// Returns `None` for `mixed`, which declares no constraint. Named types
/// such as `User` or `User[]` canonicalize to `array`.
///
/// ```
/// use daedalus_core::value::canonical_type;
///
/// assert_eq!(canonical_type("bool").as_deref(), Some("boolean"));
/// assert_eq!(canonical_type("object").as_deref(), Some("array"));
/// assert_eq!(canonical_type("mixed"), None);
/// ```
#[must_use]
pub fn canonical_type(declared: &str) -> Option<String> {
    let lower = declared.trim().to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "mixed" | "void" | "" => return None,
        "bool" | "boolean" => "boolean",
        "int" | "integer" => "integer",
        "float" | "double" => "double",
        "str" | "string" => "string",
        "object" | "map" | "list" | "array" => "array",
        "null" => "null",
        // Named types (`User`, `User[]`) serialize to objects or arrays.
        _ => "array",
    };
    Some(canonical.to_string())
}

/// Outcome of coercing a method result.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// A scalar result reduced to its truthiness.
    Scalar(bool),
    /// A structured result passed through unchanged.
    Structured(Value),
}

impl Coerced {
    /// Returns `false` only for a falsy scalar.
    #[must_use]
    pub const fn is_truthy(&self) -> bool {
        match self {
            Self::Scalar(truthy) => *truthy,
            Self::Structured(_) => true,
        }
    }
}

/// Coerces a method result for the envelope.
///
/// - integer and boolean reduce to a boolean
/// - double is truthy iff its floor is non-zero
/// - string is truthy iff its leading integer is non-zero
/// - arrays and objects pass through
/// - `null` is [`RpcError::ReturnTypeNotSupported`]
pub fn coerce(value: Value) -> RpcResult<Coerced> {
    match value {
        Value::Bool(b) => Ok(Coerced::Scalar(b)),
        Value::Number(n) => {
            let truthy = if let Some(i) = n.as_i64() {
                i != 0
            } else if let Some(u) = n.as_u64() {
                u != 0
            } else {
                n.as_f64().is_some_and(|f| f.floor() != 0.0)
            };
            Ok(Coerced::Scalar(truthy))
        }
        Value::String(s) => Ok(Coerced::Scalar(leading_integer(&s) != 0)),
        structured @ (Value::Array(_) | Value::Object(_)) => Ok(Coerced::Structured(structured)),
        Value::Null => Err(RpcError::ReturnTypeNotSupported {
            actual: RuntimeType::Null.as_str().to_string(),
        }),
    }
}

/// Parses the leading integer of a string, `0` if there is none.
///
/// Leading whitespace and one sign are accepted; parsing stops at the first
/// non-digit. Saturates on overflow.
#[must_use]
pub fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        value = value.saturating_mul(10).saturating_add(digit);
    }
    if negative {
        -value
    } else {
        value
    }
}
