//! In-memory test client.

use crate::error::TestError;
use crate::response::TestResponse;
use bytes::Bytes;
use daedalus_core::{CallerIdentity, RpcService};
use daedalus_pipeline::Dispatcher;
use http::{header, Method};
use serde::Serialize;
use serde_json::{Map, Value};

const SECURE_ORIGIN: &str = "https://daedalus.test";
const INSECURE_ORIGIN: &str = "http://daedalus.test";

/// Dispatches calls to a [`Dispatcher`] without a network.
///
/// Requests go through [`Dispatcher::dispatch`], so routing below the
/// service's base route, header handling and envelope rendering are the
/// same as in production.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use daedalus_core::fixtures::{InMemoryTransactions, UserDirectory};
/// use daedalus_pipeline::Dispatcher;
/// use daedalus_test::TestClient;
///
/// let dispatcher = Dispatcher::builder(UserDirectory::new())
///     .transactions(Arc::new(InMemoryTransactions::new()))
///     .build();
/// let client = TestClient::new(dispatcher);
/// client.call("delete-user").param("userId", 1).send().assert_error("USER_PROTECTED");
/// ```
#[derive(Debug)]
#[must_use]
pub struct TestClient {
    dispatcher: Dispatcher,
    identity: Option<CallerIdentity>,
}

impl TestClient {
    /// Creates a client for a built dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            identity: None,
        }
    }

    /// Creates a client for a service with the default dispatcher setup.
    pub fn from_service<S: RpcService>(service: S) -> Self {
        Self::new(Dispatcher::builder(service).build())
    }

    /// Sends every call as `identity`.
    pub fn with_identity(mut self, identity: CallerIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Returns the dispatcher under test.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Starts a POST call to `action` over a secure channel.
    pub fn call(&self, action: impl AsRef<str>) -> TestCall<'_> {
        TestCall::new(self, action.as_ref())
    }

    /// Calls the built-in `ping` action.
    pub fn ping(&self) -> TestResponse {
        self.call("ping").send()
    }

    /// Fetches the definition document from the default action.
    pub fn definition(&self) -> TestResponse {
        self.call("").send()
    }

    /// Fetches the plain-text documentation page.
    pub fn documentation(&self) -> TestResponse {
        self.call(daedalus_pipeline::DOCUMENTATION_ACTION).send()
    }

    fn uri(&self, action: &str, secure: bool, query: &str) -> String {
        let origin = if secure { SECURE_ORIGIN } else { INSECURE_ORIGIN };
        let base = self.dispatcher.service_info().base_route.trim_end_matches('/');
        let mut uri = format!("{origin}{base}/{}", action.trim_matches('/'));
        if !query.is_empty() {
            uri.push('?');
            uri.push_str(query);
        }
        uri
    }
}

/// A call being built by [`TestClient::call`].
#[must_use]
pub struct TestCall<'a> {
    client: &'a TestClient,
    action: String,
    method: Method,
    secure: bool,
    params: Map<String, Value>,
    raw: Option<Bytes>,
    query: Vec<String>,
    identity: Option<CallerIdentity>,
}

impl<'a> TestCall<'a> {
    fn new(client: &'a TestClient, action: &str) -> Self {
        Self {
            client,
            action: action.to_string(),
            method: Method::POST,
            secure: true,
            params: Map::new(),
            raw: None,
            query: Vec::new(),
            identity: client.identity.clone(),
        }
    }

    /// Adds a body parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds every field of a serializable object as body parameters.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not serialize to a JSON object.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::Object(fields)) => self.params.extend(fields),
            Ok(other) => panic!("expected a JSON object, got {other}"),
            Err(e) => panic!("JSON serialization failed: {e}"),
        }
        self
    }

    /// Sends `body` verbatim instead of the collected parameters.
    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.raw = Some(body.into());
        self
    }

    /// Adds a positional route argument as a query pair.
    pub fn route_arg(mut self, name: &str, value: &str) -> Self {
        self.query.push(format!("{name}={value}"));
        self
    }

    /// Uses another HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sends the call over plain HTTP.
    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    /// Sends the call as `identity`.
    pub fn identity(mut self, identity: CallerIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Builds the HTTP request.
    pub fn build(self) -> Result<http::Request<Bytes>, TestError> {
        let body = match self.raw {
            Some(raw) => raw,
            None if self.params.is_empty() => Bytes::new(),
            None => Bytes::from(serde_json::to_vec(&Value::Object(self.params))?),
        };

        let uri = self.client.uri(&self.action, self.secure, &self.query.join("&"));
        let mut request = http::Request::builder()
            .method(self.method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .map_err(|e| TestError::RequestBuild(e.to_string()))?;

        if let Some(identity) = self.identity {
            request.extensions_mut().insert(identity);
        }
        Ok(request)
    }

    /// Dispatches the call.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub fn send(self) -> TestResponse {
        let client = self.client;
        let request = self.build().unwrap_or_else(|e| panic!("{e}"));
        TestResponse::from_http(client.dispatcher.dispatch(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::fixtures::{InMemoryTransactions, UserDirectory};
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> TestClient {
        TestClient::from_service(UserDirectory::new())
    }

    #[test]
    fn test_uri_below_base_route() {
        let request = client().call("get-user").param("userId", 2).build().unwrap();
        assert_eq!(request.uri().to_string(), "https://daedalus.test/user-directory/get-user");
        assert_eq!(request.method(), Method::POST);
        assert_eq!(serde_json::from_slice::<Value>(request.body()).unwrap(), json!({"userId": 2}));
    }

    #[test]
    fn test_ping() {
        client()
            .ping()
            .assert_success()
            .assert_field("message", &json!("pong"))
            .assert_content_type("application/json");
    }

    #[test]
    fn test_insecure_and_method_policing() {
        let client = client();
        client.call("get-user").param("userId", 2).insecure().send().assert_error("NotSecure");
        client.call("get-user").method(Method::GET).send().assert_error("NotPost");
    }

    #[test]
    fn test_identity_reaches_permissions() {
        let client = client();
        client.call("find-users").param("query", "a").send().assert_error("AccessDenied");
        client
            .call("find-users")
            .param("query", "a")
            .identity(CallerIdentity::user("7").with_permission("users.read"))
            .send()
            .assert_success();
    }

    #[test]
    fn test_transactional_call_needs_manager() {
        client().call("delete-user").param("userId", 1).send().assert_error("InternalError");

        let dispatcher = Dispatcher::builder(UserDirectory::new())
            .transactions(Arc::new(InMemoryTransactions::new()))
            .build();
        let client = TestClient::new(dispatcher);
        client.call("delete-user").param("userId", 1).send().assert_error("USER_PROTECTED");
        client.call("delete-user").param("userId", 3).send().assert_success();
    }

    #[test]
    fn test_raw_body() {
        client().call("get-user").raw_body("{not json").send().assert_error("JsonError");
    }

    #[test]
    fn test_definition_and_documentation() {
        let definition = client().definition();
        definition.assert_success();
        let methods = definition.field("methods").unwrap();
        assert!(methods.get("get-user").is_some());

        client()
            .documentation()
            .assert_content_type("text/plain")
            .assert_body_contains("get-user");
    }
}
