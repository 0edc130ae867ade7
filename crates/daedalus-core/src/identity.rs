//! Caller identity and the authentication/permission collaborators.
//!
//! The host resolves who is calling (session, token, ...) and hands the
//! result to the dispatcher as a [`CallerIdentity`]. Whether a call may
//! proceed is decided by two pluggable collaborators:
//!
//! - [`Authorizer`] answers "is this caller logged in for this action"
//! - [`PermissionOracle`] answers "does this caller hold permission X"

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Permission name that grants every permission.
pub const WILDCARD_PERMISSION: &str = "*";

/// The identity of the caller making a request.
///
/// # Example
///
/// ```rust
/// use daedalus_core::CallerIdentity;
///
/// let identity = CallerIdentity::user("user-123").with_permission("users.read");
/// assert_eq!(identity.log_id(), "user:user-123");
/// assert!(identity.permissions().contains("users.read"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// No authenticated caller.
    #[default]
    Anonymous,
    /// An authenticated user.
    User {
        /// Stable user identifier.
        user_id: String,
        /// Permissions granted to the user.
        #[serde(default)]
        permissions: BTreeSet<String>,
    },
}

impl CallerIdentity {
    /// Creates an anonymous identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates a user identity without permissions.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User {
            user_id: user_id.into(),
            permissions: BTreeSet::new(),
        }
    }

    /// Adds a permission. No-op for anonymous callers.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        if let Self::User { permissions, .. } = &mut self {
            permissions.insert(permission.into());
        }
        self
    }

    /// Returns `true` for an authenticated caller.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Returns the user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User { user_id, .. } => Some(user_id),
            Self::Anonymous => None,
        }
    }

    /// Returns the granted permissions (empty for anonymous callers).
    #[must_use]
    pub fn permissions(&self) -> BTreeSet<&str> {
        match self {
            Self::User { permissions, .. } => permissions.iter().map(String::as_str).collect(),
            Self::Anonymous => BTreeSet::new(),
        }
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never contains secrets.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::User { user_id, .. } => format!("user:{user_id}"),
            Self::Anonymous => "anonymous".to_string(),
        }
    }
}

/// Decides whether the caller is authenticated for an action.
///
/// Invoked by the dispatcher for every method that does not carry the
/// `@no-auth` marker. The default implementation allows everything.
pub trait Authorizer: Send + Sync {
    /// Returns `true` when the call may proceed.
    ///
    /// `stateless` reflects the service's `stateless` property, `action` is
    /// the requested action id and `input` the parsed request body.
    fn check_auth(&self, stateless: bool, action: &str, input: &Map<String, Value>) -> bool {
        let _ = (stateless, action, input);
        true
    }
}

/// An authorizer that allows every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {}

/// An authorizer that rejects every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn check_auth(&self, _stateless: bool, _action: &str, _input: &Map<String, Value>) -> bool {
        false
    }
}

/// An authorizer backed by a closure.
///
/// # Example
///
/// ```
/// use daedalus_core::{Authorizer, FnAuthorizer};
///
/// let only_stateless = FnAuthorizer::new(|stateless, _action, _input| stateless);
/// assert!(only_stateless.check_auth(true, "ping", &serde_json::Map::new()));
/// ```
pub struct FnAuthorizer<F> {
    check: F,
}

impl<F> FnAuthorizer<F>
where
    F: Fn(bool, &str, &Map<String, Value>) -> bool + Send + Sync,
{
    /// Wraps the closure.
    pub const fn new(check: F) -> Self {
        Self { check }
    }
}

impl<F> Authorizer for FnAuthorizer<F>
where
    F: Fn(bool, &str, &Map<String, Value>) -> bool + Send + Sync,
{
    fn check_auth(&self, stateless: bool, action: &str, input: &Map<String, Value>) -> bool {
        (self.check)(stateless, action, input)
    }
}

impl<F> std::fmt::Debug for FnAuthorizer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAuthorizer").finish_non_exhaustive()
    }
}

/// Answers permission queries for declared `@permission` names.
pub trait PermissionOracle: Send + Sync {
    /// Returns `true` if `identity` holds `permission`.
    fn has_permission(&self, identity: &CallerIdentity, permission: &str) -> bool;
}

/// Checks the permissions carried by the identity itself.
///
/// The [`WILDCARD_PERMISSION`] grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPermissions;

impl PermissionOracle for IdentityPermissions {
    fn has_permission(&self, identity: &CallerIdentity, permission: &str) -> bool {
        match identity {
            CallerIdentity::User { permissions, .. } => {
                permissions.contains(permission) || permissions.contains(WILDCARD_PERMISSION)
            }
            CallerIdentity::Anonymous => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_log_id() {
        assert_eq!(CallerIdentity::anonymous().log_id(), "anonymous");
        assert!(!CallerIdentity::anonymous().is_authenticated());
    }

    #[test]
    fn test_anonymous_ignores_permissions() {
        let identity = CallerIdentity::anonymous().with_permission("admin");
        assert!(identity.permissions().is_empty());
    }

    #[test]
    fn test_identity_permissions() {
        let oracle = IdentityPermissions;
        let reader = CallerIdentity::user("u1").with_permission("users.read");
        assert!(oracle.has_permission(&reader, "users.read"));
        assert!(!oracle.has_permission(&reader, "users.write"));
        assert!(!oracle.has_permission(&CallerIdentity::Anonymous, "users.read"));
    }

    #[test]
    fn test_wildcard_permission() {
        let admin = CallerIdentity::user("root").with_permission(WILDCARD_PERMISSION);
        assert!(IdentityPermissions.has_permission(&admin, "anything.at.all"));
    }

    #[test]
    fn test_default_authorizers() {
        let input = Map::new();
        assert!(AllowAll.check_auth(false, "x", &input));
        assert!(!DenyAll.check_auth(true, "x", &input));
        let by_action = FnAuthorizer::new(|_, action: &str, _: &Map<String, Value>| action == "open");
        assert!(by_action.check_auth(false, "open", &input));
        assert!(!by_action.check_auth(false, "closed", &input));
    }

    #[test]
    fn test_identity_serialization() {
        let identity = CallerIdentity::user("u1").with_permission("p");
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["user_id"], "u1");
    }
}
