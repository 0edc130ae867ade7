//! Response envelope rendering.
//!
//! Every call, successful or not, is answered with HTTP 200 and a JSON
//! object carrying `hasErrors` and `errors`. A successful call adds the
//! fields of the method result; once any error is recorded those fields are
//! dropped.
//!
//! ```json
//! {
//!   "id": 2,
//!   "name": "alice",
//!   "hasErrors": false,
//!   "errors": []
//! }
//! ```

use bytes::Bytes;
use daedalus_core::ErrorEntry;
use http::header::{
    HeaderValue, CACHE_CONTROL, CONTENT_TYPE, EXPIRES, LAST_MODIFIED, PRAGMA,
};
use serde_json::{json, Map, Value};

/// Content type of envelopes.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Content type of the documentation page.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

const EXPIRED: &str = "Sat, 26 Jul 1997 05:00:00 GMT";

/// The uniform response object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
    errors: Vec<ErrorEntry>,
}

impl Envelope {
    /// Creates an envelope; fields are dropped when `errors` is non-empty.
    #[must_use]
    pub fn new(fields: Map<String, Value>, errors: Vec<ErrorEntry>) -> Self {
        let fields = if errors.is_empty() { fields } else { Map::new() };
        Self { fields, errors }
    }

    /// Creates an error-free envelope.
    #[must_use]
    pub fn success(fields: Map<String, Value>) -> Self {
        Self::new(fields, Vec::new())
    }

    /// Creates an envelope carrying only errors.
    #[must_use]
    pub fn failure(errors: Vec<ErrorEntry>) -> Self {
        Self::new(Map::new(), errors)
    }

    /// Returns `true` if any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the recorded errors.
    #[must_use]
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Returns the method-specific fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the JSON object sent to the caller.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("hasErrors".to_string(), Value::Bool(self.has_errors()));
        object.insert(
            "errors".to_string(),
            Value::Array(
                self.errors
                    .iter()
                    .map(|e| json!({"message": e.message, "code": e.code}))
                    .collect(),
            ),
        );
        Value::Object(object)
    }

    /// Renders the envelope as an HTTP response.
    #[must_use]
    pub fn into_response(self) -> http::Response<Bytes> {
        respond(Bytes::from(self.to_value().to_string()), JSON_CONTENT_TYPE)
    }
}

/// What a dispatched call produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A JSON envelope.
    Envelope(Envelope),
    /// A plain-text page.
    Text(String),
}

impl Reply {
    /// Returns the envelope, `None` for text replies.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            Self::Text(_) => None,
        }
    }

    /// Renders the reply as an HTTP response.
    #[must_use]
    pub fn into_response(self) -> http::Response<Bytes> {
        match self {
            Self::Envelope(envelope) => envelope.into_response(),
            Self::Text(text) => respond(Bytes::from(text), TEXT_CONTENT_TYPE),
        }
    }
}

fn respond(body: Bytes, content_type: &'static str) -> http::Response<Bytes> {
    let mut response = http::Response::new(body);
    let headers = response.headers_mut();
    headers.insert(EXPIRES, HeaderValue::from_static(EXPIRED));
    let now = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    if let Ok(value) = HeaderValue::from_str(&now) {
        headers.insert(LAST_MODIFIED, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.append(
        CACHE_CONTROL,
        HeaderValue::from_static("post-check=0, pre-check=0"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn fields() -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("id".to_string(), json!(2));
        fields
    }

    #[test]
    fn test_success_envelope() {
        let value = Envelope::success(fields()).to_value();
        assert_eq!(value, json!({"id": 2, "hasErrors": false, "errors": []}));
    }

    #[test]
    fn test_errors_drop_fields() {
        let envelope = Envelope::new(fields(), vec![ErrorEntry::new("Nope", "NotLoggedIn")]);
        assert!(envelope.fields().is_empty());
        assert_eq!(
            envelope.to_value(),
            json!({"hasErrors": true, "errors": [{"message": "Nope", "code": "NotLoggedIn"}]})
        );
    }

    #[test]
    fn test_response_headers() {
        let response = Envelope::success(Map::new()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(headers[EXPIRES], EXPIRED);
        assert_eq!(headers[PRAGMA], "no-cache");
        assert!(headers[LAST_MODIFIED].to_str().unwrap().ends_with(" GMT"));
        let cache_control: Vec<_> = headers.get_all(CACHE_CONTROL).iter().collect();
        assert_eq!(cache_control.len(), 2);
        assert_eq!(cache_control[1], "post-check=0, pre-check=0");
    }

    #[test]
    fn test_text_reply() {
        let response = Reply::Text("docs".to_string()).into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_CONTENT_TYPE);
        assert_eq!(response.body().as_ref(), b"docs");
    }
}
