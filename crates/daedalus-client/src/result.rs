//! Typed view of a reply envelope.

use crate::error::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable error code, e.g. `ParamNotFound`.
    #[serde(default)]
    pub code: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

/// A decoded reply: the envelope flags plus the method's own fields.
///
/// `data` is only decoded when the envelope carries no errors.
///
/// ```
/// use daedalus_client::ApiResult;
/// use serde_json::{json, Map, Value};
///
/// let reply = json!({"hasErrors": false, "errors": [], "name": "alice"});
/// let result: ApiResult<Map<String, Value>> = ApiResult::from_value(reply).unwrap();
/// assert_eq!(result.data.unwrap()["name"], "alice");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult<T = Map<String, Value>> {
    /// Whether the call failed.
    pub has_errors: bool,
    /// Errors reported by the remote service.
    pub errors: Vec<ApiError>,
    /// Method fields of a successful call.
    pub data: Option<T>,
}

impl<T: DeserializeOwned> ApiResult<T> {
    /// Decodes an envelope.
    ///
    /// Missing `hasErrors` or `errors` keys read as a success with no
    /// errors.
    pub fn from_value(value: Value) -> ClientResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(ClientError::malformed("reply is not a JSON object"));
        };

        let has_errors = fields
            .remove("hasErrors")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let errors = match fields.remove("errors") {
            Some(Value::Null) | None => Vec::new(),
            Some(errors) => serde_json::from_value(errors)?,
        };
        let data = if has_errors {
            None
        } else {
            Some(serde_json::from_value(Value::Object(fields))?)
        };

        Ok(Self {
            has_errors,
            errors,
            data,
        })
    }
}

impl<T> ApiResult<T> {
    /// Returns the error messages joined with `", "`, or an empty string
    /// for a successful call.
    pub fn error_string(&self) -> String {
        if !self.has_errors {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns `true` if any error carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Converts into the method fields, or a [`ClientError::Remote`].
    pub fn into_data(self) -> ClientResult<T> {
        if self.has_errors {
            return Err(ClientError::Remote {
                message: self.error_string(),
                codes: self.errors.into_iter().map(|e| e.code).collect(),
            });
        }
        self.data.ok_or_else(|| ClientError::malformed("reply carries no data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct User {
        user_id: u64,
        name: String,
    }

    #[test]
    fn test_typed_success() {
        let reply = json!({"hasErrors": false, "errors": [], "userId": 2, "name": "alice"});
        let result: ApiResult<User> = ApiResult::from_value(reply).unwrap();
        assert!(!result.has_errors);
        assert_eq!(result.error_string(), "");
        assert_eq!(
            result.into_data().unwrap(),
            User {
                user_id: 2,
                name: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_failure_skips_data() {
        let reply = json!({
            "hasErrors": true,
            "errors": [
                {"code": "ParamNotFound", "message": "Missing userId"},
                {"code": "NotLoggedIn", "message": "Login required"}
            ]
        });
        let result: ApiResult<User> = ApiResult::from_value(reply).unwrap();
        assert!(result.data.is_none());
        assert!(result.has_code("NotLoggedIn"));
        assert_eq!(result.error_string(), "Missing userId, Login required");

        match result.into_data() {
            Err(ClientError::Remote { codes, .. }) => assert_eq!(codes, ["ParamNotFound", "NotLoggedIn"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_error_string_ignores_errors_on_success() {
        let result: ApiResult = ApiResult {
            has_errors: false,
            errors: vec![ApiError {
                code: "X".to_string(),
                message: "stale".to_string(),
            }],
            data: Some(Map::new()),
        };
        assert_eq!(result.error_string(), "");
    }

    #[test]
    fn test_rejects_non_object() {
        let err = ApiResult::<Map<String, Value>>::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ClientError::Malformed { .. }));
    }
}
