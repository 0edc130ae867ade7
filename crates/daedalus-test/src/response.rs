//! Test response with envelope assertions.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A response returned by [`TestClient`](crate::TestClient).
///
/// The `assert_*` methods panic with a readable message and return `&Self`
/// so they can be chained.
///
/// # Example
///
/// ```
/// use daedalus_core::fixtures::UserDirectory;
/// use daedalus_test::TestClient;
///
/// let client = TestClient::from_service(UserDirectory::new());
/// client
///     .call("get-user")
///     .param("userId", 2)
///     .send()
///     .assert_success()
///     .assert_field("name", &"alice".into());
/// ```
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Creates a test response from a dispatched HTTP response.
    pub fn from_http(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Returns the status code. Envelopes are always `200`.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Returns a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Returns the body as an envelope object.
    pub fn envelope(&self) -> Result<Value, TestError> {
        let value: Value = self.json()?;
        let is_envelope = value.get("hasErrors").is_some_and(Value::is_boolean)
            && value.get("errors").is_some_and(Value::is_array);
        if is_envelope {
            Ok(value)
        } else {
            Err(TestError::NotEnvelope(value.to_string()))
        }
    }

    /// Returns `true` if the envelope reports errors.
    ///
    /// Text replies never do.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.envelope()
            .ok()
            .and_then(|v| v["hasErrors"].as_bool())
            .unwrap_or(false)
    }

    /// Returns the error codes in order.
    #[must_use]
    pub fn error_codes(&self) -> Vec<String> {
        self.error_entries()
            .iter()
            .filter_map(|e| e["code"].as_str().map(str::to_string))
            .collect()
    }

    /// Returns the error messages in order.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.error_entries()
            .iter()
            .filter_map(|e| e["message"].as_str().map(str::to_string))
            .collect()
    }

    /// Returns a method field of the envelope.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        self.envelope().ok().and_then(|v| v.get(name).cloned())
    }

    fn error_entries(&self) -> Vec<Value> {
        self.envelope()
            .ok()
            .and_then(|v| v["errors"].as_array().cloned())
            .unwrap_or_default()
    }

    // ==================== Assertions ====================

    /// Asserts the call succeeded.
    pub fn assert_success(&self) -> &Self {
        let envelope = self.envelope().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            envelope["hasErrors"],
            Value::Bool(false),
            "Expected success, got errors: {}",
            envelope["errors"]
        );
        self
    }

    /// Asserts the call failed with exactly one error carrying `code`.
    pub fn assert_error(&self, code: &str) -> &Self {
        let codes = self.error_codes();
        assert!(self.has_errors(), "Expected error {code}, call succeeded");
        assert_eq!(codes, [code], "Expected error {code}, got {codes:?}");
        self
    }

    /// Asserts one of the errors carries `code`.
    pub fn assert_error_contains(&self, code: &str) -> &Self {
        let codes = self.error_codes();
        assert!(
            codes.iter().any(|c| c == code),
            "Expected error {code} among {codes:?}"
        );
        self
    }

    /// Asserts a method field equals `expected`.
    pub fn assert_field(&self, name: &str, expected: &Value) -> &Self {
        let actual = self
            .field(name)
            .unwrap_or_else(|| panic!("Field '{name}' not found in {}", String::from_utf8_lossy(&self.body)));
        assert_eq!(&actual, expected, "Field '{name}' mismatch");
        self
    }

    /// Asserts the whole body equals `expected`.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        let actual: Value = self.json().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts the Content-Type starts with `expected`.
    pub fn assert_content_type(&self, expected: &str) -> &Self {
        let actual = self.content_type().unwrap_or_else(|| panic!("Content-Type header not found"));
        assert!(
            actual.starts_with(expected),
            "Content-Type: expected '{expected}', got '{actual}'"
        );
        self
    }

    /// Asserts the text body contains `expected`.
    pub fn assert_body_contains(&self, expected: &str) -> &Self {
        let body = self.text().unwrap_or_else(|e| panic!("{e}"));
        assert!(body.contains(expected), "Body should contain '{expected}', got: {body}");
        self
    }
}
