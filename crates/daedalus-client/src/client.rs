//! HTTP client for calling remote services.

use std::sync::Arc;
use std::time::Duration;

use daedalus_config::ClientSection;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};
use crate::result::ApiResult;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const MAX_REDIRECTS: usize = 10;

/// Supplies the credentials sent with every call.
///
/// The returned keys are merged into the request body and win over
/// caller parameters with the same name.
pub trait AuthProvider: Send + Sync {
    /// Returns the authorization parameters.
    fn authorize(&self) -> Map<String, Value>;
}

/// Sends no credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthProvider for NoAuth {
    fn authorize(&self) -> Map<String, Value> {
        Map::new()
    }
}

/// Sends a fixed set of credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth(Map<String, Value>);

impl StaticAuth {
    /// Creates an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl AuthProvider for StaticAuth {
    fn authorize(&self) -> Map<String, Value> {
        self.0.clone()
    }
}

/// Client for a remote service reachable through one or more hosts.
///
/// Hosts are tried in order; the first one that answers with a success
/// status and a JSON body wins.
///
/// ```no_run
/// use daedalus_client::{ApiClient, StaticAuth};
/// use daedalus_config::ClientSection;
///
/// # async fn demo() -> Result<(), daedalus_client::ClientError> {
/// let section = ClientSection {
///     hosts: vec!["https://a.example.com".into(), "https://b.example.com".into()],
///     ..ClientSection::default()
/// };
/// let client = ApiClient::new(&section)?.with_auth(StaticAuth::new().with("apiKey", "secret"));
///
/// let reply = client.send("get-user", serde_json::Map::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    hosts: Vec<String>,
    api_path: String,
    timeout: Duration,
    auth: Arc<dyn AuthProvider>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("hosts", &self.hosts)
            .field("api_path", &self.api_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client from the `[client]` configuration section.
    pub fn new(section: &ClientSection) -> ClientResult<Self> {
        if section.hosts.is_empty() {
            return Err(ClientError::NoHosts);
        }

        let timeout = Duration::from_millis(section.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(section.user_agent.as_str())
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ClientError::Build {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            hosts: section.hosts.clone(),
            api_path: section.api_path.clone(),
            timeout,
            auth: Arc::new(NoAuth),
        })
    }

    /// Sets the credential provider.
    #[must_use]
    pub fn with_auth<A: AuthProvider + 'static>(mut self, auth: A) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// Returns the configured hosts.
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the URL of `action` on `host`.
    pub fn endpoint(&self, host: &str, action: &str) -> String {
        let host = host.trim_end_matches('/');
        let path = self.api_path.trim_matches('/');
        if path.is_empty() {
            format!("{host}/{action}")
        } else {
            format!("{host}/{path}/{action}")
        }
    }

    /// Calls `action` and returns the decoded reply.
    ///
    /// Transport failures and non-success statuses move on to the next
    /// host. A body that is not JSON is an error without failover.
    pub async fn send(&self, action: &str, params: Map<String, Value>) -> ClientResult<Value> {
        let body = serde_json::to_vec(&self.request_body(params))?;
        let mut last = String::new();

        for host in &self.hosts {
            let url = self.endpoint(host, action);
            tracing::debug!(url = %url, action = %action, "sending call");

            let response = match self
                .client
                .post(&url)
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body.clone())
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "host unreachable, trying next");
                    last = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(url = %url, status = status.as_u16(), "host answered with error status, trying next");
                last = format!("{url} answered {status}");
                continue;
            }

            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "failed to read reply, trying next");
                    last = e.to_string();
                    continue;
                }
            };

            return Ok(serde_json::from_slice(&bytes)?);
        }

        Err(ClientError::Unavailable {
            attempted: self.hosts.len(),
            last,
        })
    }

    /// Calls `action` and decodes the reply into an [`ApiResult`].
    pub async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Map<String, Value>,
    ) -> ClientResult<ApiResult<T>> {
        let value = self.send(action, params).await?;
        ApiResult::from_value(value)
    }

    /// Returns `true` if the service answers `ping` with `pong`.
    pub async fn ping(&self) -> bool {
        match self.send("ping", Map::new()).await {
            Ok(reply) => reply.get("message").and_then(Value::as_str) == Some("pong"),
            Err(e) => {
                tracing::debug!(error = %e, "ping failed");
                false
            }
        }
    }

    fn request_body(&self, mut params: Map<String, Value>) -> Map<String, Value> {
        params.extend(self.auth.authorize());
        params
    }
}
