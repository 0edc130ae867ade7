//! Inbound calls.
//!
//! An [`InboundCall`] carries the transport facts the dispatcher polices
//! (method, secure channel) together with the action id, the raw body, the
//! positional route arguments and the caller identity supplied by the host.

use bytes::Bytes;
use daedalus_core::CallerIdentity;
use http::Method;
use serde_json::{Map, Value};

/// Header set by TLS-terminating proxies.
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// One call as received from the host.
///
/// # Example
///
/// ```
/// use daedalus_pipeline::InboundCall;
///
/// let call = InboundCall::post("get-user", r#"{"userId": 2}"#);
/// assert!(call.secure);
/// assert_eq!(call.action, "get-user");
/// ```
#[derive(Debug, Clone)]
pub struct InboundCall {
    /// HTTP method.
    pub method: Method,
    /// Whether the call arrived over a secure channel.
    pub secure: bool,
    /// Requested action id, empty for the default action.
    pub action: String,
    /// Raw request body.
    pub body: Bytes,
    /// Positional route arguments.
    pub route_args: Map<String, Value>,
    /// Caller identity.
    pub identity: CallerIdentity,
}

impl InboundCall {
    /// Creates a secure anonymous POST call.
    #[must_use]
    pub fn post(action: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::POST,
            secure: true,
            action: action.into(),
            body: body.into(),
            route_args: Map::new(),
            identity: CallerIdentity::Anonymous,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the secure-channel flag.
    #[must_use]
    pub const fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the caller identity.
    #[must_use]
    pub fn identity(mut self, identity: CallerIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Adds a positional route argument.
    #[must_use]
    pub fn route_arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.route_args.insert(name.into(), value);
        self
    }

    /// Builds a call from an HTTP request addressed below `base_route`.
    ///
    /// The action id is the path segment after `base_route`, query pairs
    /// become string route arguments, and a [`CallerIdentity`] placed in the
    /// request extensions by the host is picked up. The channel counts as
    /// secure for an `https` URI or an `X-Forwarded-Proto: https` header.
    #[must_use]
    pub fn from_http(request: http::Request<Bytes>, base_route: &str) -> Self {
        let (parts, body) = request.into_parts();

        let path = parts.uri.path();
        let action = path
            .strip_prefix(base_route.trim_end_matches('/'))
            .unwrap_or(path)
            .trim_matches('/')
            .to_string();

        let route_args = parts
            .uri
            .query()
            .map(parse_query)
            .unwrap_or_default();

        let secure = parts.uri.scheme_str() == Some("https")
            || parts
                .headers
                .get(FORWARDED_PROTO)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));

        let identity = parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .unwrap_or_default();

        Self {
            method: parts.method,
            secure,
            action,
            body,
            route_args,
            identity,
        }
    }
}

fn parse_query(query: &str) -> Map<String, Value> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), Value::String(value.to_string())),
            None => (pair.to_string(), Value::String(String::new())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_http_resolves_action_and_args() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("https://api.example.com/user-directory/get-user?tenant=7&dry")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let call = InboundCall::from_http(request, "/user-directory");
        assert_eq!(call.action, "get-user");
        assert!(call.secure);
        assert_eq!(call.route_args["tenant"], json!("7"));
        assert_eq!(call.route_args["dry"], json!(""));
        assert_eq!(call.identity, CallerIdentity::Anonymous);
    }

    #[test]
    fn test_from_http_forwarded_proto_and_identity() {
        let mut request = http::Request::builder()
            .method(Method::GET)
            .uri("/users/")
            .header("X-Forwarded-Proto", "HTTPS")
            .body(Bytes::new())
            .unwrap();
        request
            .extensions_mut()
            .insert(CallerIdentity::user("42"));

        let call = InboundCall::from_http(request, "/users");
        assert_eq!(call.action, "");
        assert!(call.secure);
        assert_eq!(call.method, Method::GET);
        assert_eq!(call.identity.user_id(), Some("42"));
    }

    #[test]
    fn test_plain_http_is_not_secure() {
        let request = http::Request::builder()
            .uri("http://localhost/users/ping")
            .body(Bytes::new())
            .unwrap();
        assert!(!InboundCall::from_http(request, "/users").secure);
    }
}
