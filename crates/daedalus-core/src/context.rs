//! Per-call context types.
//!
//! A [`CallContext`] is created by the dispatcher for every inbound call and
//! owns everything that used to be process-wide state: the parsed
//! [`RequestContext`], the accumulated [`ErrorEntry`] list, the caller
//! identity and the [`TransactionSlot`].

use crate::error::{ErrorEntry, RpcError, RpcResult};
use crate::identity::CallerIdentity;
use crate::transaction::TransactionSlot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;
use uuid::Uuid;

/// A unique identifier for each call, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it suitable for log correlation.
///
/// # Example
///
/// ```
/// use daedalus_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The parsed JSON body of the current call.
///
/// Produced once per call by [`RequestContext::parse`] and consumed by
/// parameter validation.
///
/// # Example
///
/// ```
/// use daedalus_core::RequestContext;
///
/// let request = RequestContext::parse(br#"{"userId": 7}"#, true).unwrap();
/// assert_eq!(request.get("userId"), Some(&serde_json::json!(7)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    input: Map<String, Value>,
}

impl RequestContext {
    /// Creates a request context from an already decoded object.
    #[must_use]
    pub const fn from_map(input: Map<String, Value>) -> Self {
        Self { input }
    }

    /// Parses a raw request body.
    ///
    /// An empty (or whitespace-only) body is rejected with
    /// [`RpcError::EmptyRequest`] when `reject_empty` is set, otherwise it
    /// yields an empty input map. Anything that is not a JSON object is a
    /// [`RpcError::JsonError`].
    pub fn parse(body: &[u8], reject_empty: bool) -> RpcResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            if reject_empty {
                return Err(RpcError::EmptyRequest);
            }
            return Ok(Self::default());
        }

        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(input)) => Ok(Self { input }),
            Ok(other) => Err(RpcError::JsonError {
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(RpcError::JsonError {
                reason: e.to_string(),
            }),
        }
    }

    /// Returns the value of an input key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }

    /// Returns `true` if the input contains the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.input.contains_key(key)
    }

    /// Returns the whole input object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.input
    }

    /// Returns `true` when no input keys were sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Per-call state threaded through every pipeline stage and into handlers.
///
/// Handlers that declare a `&mut CallContext` parameter receive it directly.
/// It is skipped by contract extraction, so it never needs a `@param` line.
///
/// # Example
///
/// ```
/// use daedalus_core::{CallContext, ErrorEntry};
///
/// let mut ctx = CallContext::new("get-user");
/// ctx.add_warning("Profile is incomplete", "PROFILE_INCOMPLETE");
/// assert!(ctx.has_errors());
/// assert_eq!(ctx.errors()[0], ErrorEntry::new("Profile is incomplete", "PROFILE_INCOMPLETE"));
/// ```
#[derive(Debug)]
pub struct CallContext {
    request_id: RequestId,
    action: String,
    identity: CallerIdentity,
    request: RequestContext,
    errors: Vec<ErrorEntry>,
    transaction: TransactionSlot,
    started_at: Instant,
}

impl CallContext {
    /// Creates a context for the given action id with a fresh request ID.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            action: action.into(),
            identity: CallerIdentity::Anonymous,
            request: RequestContext::default(),
            errors: Vec::new(),
            transaction: TransactionSlot::default(),
            started_at: Instant::now(),
        }
    }

    /// Returns a new context with the specified identity.
    #[must_use]
    pub fn with_identity(mut self, identity: CallerIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns a new context with the specified transaction slot.
    #[must_use]
    pub fn with_transaction(mut self, transaction: TransactionSlot) -> Self {
        self.transaction = transaction;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the action id being called.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the caller identity.
    #[must_use]
    pub const fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Returns the parsed request body.
    #[must_use]
    pub const fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Stores the parsed request body.
    pub fn set_request(&mut self, request: RequestContext) {
        self.request = request;
    }

    /// Records a warning without terminating the call.
    ///
    /// The envelope still reports `hasErrors` and drops the result fields.
    pub fn add_warning(&mut self, message: impl Into<String>, code: impl Into<String>) {
        self.errors.push(ErrorEntry::new(message, code));
    }

    /// Appends an error entry.
    pub fn push_error(&mut self, entry: ErrorEntry) {
        self.errors.push(entry);
    }

    /// Returns the accumulated error entries.
    #[must_use]
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Returns `true` if any error or warning has been recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the transaction slot.
    #[must_use]
    pub const fn transaction(&self) -> &TransactionSlot {
        &self.transaction
    }

    /// Returns the transaction slot mutably.
    pub fn transaction_mut(&mut self) -> &mut TransactionSlot {
        &mut self.transaction
    }

    /// Returns the elapsed time since the call started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_display() {
        let display = RequestId::new().to_string();
        assert_eq!(display.len(), 36, "UUID string should be 36 characters");
    }

    #[test]
    fn test_parse_object_body() {
        let request = RequestContext::parse(br#"{"a": 1, "b": "x"}"#, true).unwrap();
        assert_eq!(request.get("a"), Some(&json!(1)));
        assert!(request.contains("b"));
        assert!(!request.contains("c"));
    }

    #[test]
    fn test_parse_empty_body_policed() {
        let err = RequestContext::parse(b"  \n", true).unwrap_err();
        assert!(matches!(err, RpcError::EmptyRequest));
    }

    #[test]
    fn test_parse_empty_body_allowed() {
        let request = RequestContext::parse(b"", false).unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = RequestContext::parse(b"{not json", true).unwrap_err();
        assert_eq!(err.code(), "JsonError");
    }

    #[test]
    fn test_parse_non_object_body() {
        let err = RequestContext::parse(b"[1, 2]", true).unwrap_err();
        match err {
            RpcError::JsonError { reason } => assert!(reason.contains("an array")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_errors_accumulate() {
        let mut ctx = CallContext::new("ping");
        assert!(!ctx.has_errors());
        ctx.add_warning("first", "W1");
        ctx.push_error(ErrorEntry::new("second", "E2"));
        assert_eq!(ctx.errors().len(), 2);
        assert_eq!(ctx.errors()[1].code, "E2");
    }

    #[test]
    fn test_context_identity() {
        let ctx = CallContext::new("ping").with_identity(CallerIdentity::user("u1"));
        assert!(ctx.identity().is_authenticated());
        assert_eq!(ctx.action(), "ping");
    }
}
