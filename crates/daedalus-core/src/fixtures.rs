//! Test fixtures for Daedalus development and testing.
//!
//! This module provides reusable collaborators and a hand-written service
//! that can be used in tests across the workspace:
//!
//! - [`InMemoryTransactions`] - a counting [`TransactionManager`]
//! - [`UserDirectory`] - a small service implementing [`ServiceMeta`] and
//!   [`RpcMethods`] by hand, the same way `#[service]`/`#[rpc]` would
//!
//! # Example
//!
//! ```
//! use daedalus_core::fixtures::UserDirectory;
//! use daedalus_core::service::RpcMethods;
//!
//! let service = UserDirectory::new();
//! assert!(service.method("action_get_user").is_some());
//! ```

use crate::context::CallContext;
use crate::error::{RpcError, RpcResult};
use crate::service::{
    Arguments, IntoRpcValue, MethodDescriptor, ParamDescriptor, PropertyDescriptor, RpcMethods,
    ServiceInfo, ServiceMeta,
};
use crate::transaction::TransactionManager;
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, Default)]
struct TransactionState {
    active: bool,
    begins: usize,
    commits: usize,
    rollbacks: usize,
}

/// A transaction manager that only counts calls.
#[derive(Debug, Default)]
pub struct InMemoryTransactions {
    state: Mutex<TransactionState>,
}

impl InMemoryTransactions {
    /// Creates a manager with no open transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `begin` calls.
    #[must_use]
    pub fn begins(&self) -> usize {
        self.state.lock().begins
    }

    /// Number of `commit` calls.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// Number of `rollback` calls.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }
}

impl TransactionManager for InMemoryTransactions {
    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn begin(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        anyhow::ensure!(!state.active, "transaction already active");
        state.active = true;
        state.begins += 1;
        Ok(())
    }

    fn commit(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        anyhow::ensure!(state.active, "no active transaction");
        state.active = false;
        state.commits += 1;
        Ok(())
    }

    fn rollback(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        anyhow::ensure!(state.active, "no active transaction");
        state.active = false;
        state.rollbacks += 1;
        Ok(())
    }
}

const GET_USER_DOC: &str = "Returns a single user.
@api
@param int userId Identifier of the user {validate=positive}
@return array The user
@return-element int id User id
@return-element string name Display name";

const FIND_USERS_DOC: &str = "Searches users by name.
@api
@permission users.read
@param string query Search text {validate=notEmpty}
@param int limit Page size {validate=positive}
@return array Matching users";

const DELETE_USER_DOC: &str = "Deletes a user.
@api
@transaction
@param int userId Identifier of the user {validate=positive}
@return bool Whether the user existed";

const STATS_DOC: &str = "Internal statistics, not exposed.
@return array Counters";

const SOURCE: &str = r#"
fn action_get_user(&self, user_id: i64) -> RpcResult<Value> {
    self.lookup(user_id).ok_or_else(|| RpcError::custom("USER_NOT_FOUND", "User not found"))
}
fn action_delete_user(&self, user_id: i64) -> RpcResult<bool> {
    if user_id == 1 { return Err(RpcError::custom("USER_PROTECTED", "User is protected")); }
}
"#;

/// A hand-written service over a fixed list of users.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    /// Whether callers authenticate without a session.
    pub stateless: bool,
    users: Vec<(i64, &'static str)>,
}

impl UserDirectory {
    /// Largest accepted page size.
    pub const MAX_PAGE: u32 = 100;

    /// Creates the directory with users 1 (`admin`), 2 (`alice`), 3 (`bob`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            stateless: false,
            users: vec![(1, "admin"), (2, "alice"), (3, "bob")],
        }
    }

    /// Marks the service as stateless.
    #[must_use]
    pub const fn stateless(mut self, stateless: bool) -> Self {
        self.stateless = stateless;
        self
    }

    fn action_get_user(&self, user_id: i64) -> RpcResult<Value> {
        self.users
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(id, name)| json!({"id": id, "name": name}))
            .ok_or_else(|| RpcError::custom("USER_NOT_FOUND", "User not found"))
    }

    fn action_find_users(&self, query: String, limit: u32) -> RpcResult<Value> {
        let users: Vec<_> = self
            .users
            .iter()
            .filter(|(_, name)| name.contains(query.as_str()))
            .take(limit.min(Self::MAX_PAGE) as usize)
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect();
        Ok(json!({"total": users.len(), "users": users}))
    }

    fn action_delete_user(&self, user_id: i64) -> RpcResult<bool> {
        if user_id == 1 {
            return Err(RpcError::custom("USER_PROTECTED", "User is protected"));
        }
        Ok(self.users.iter().any(|(id, _)| *id == user_id))
    }

    fn action_stats(&self) -> RpcResult<Value> {
        Ok(json!({"users": self.users.len()}))
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMeta for UserDirectory {
    fn service_info(&self) -> ServiceInfo {
        ServiceInfo::new(
            "UserDirectory",
            module_path!(),
            file!(),
            "/user-directory",
            Some("Directory of registered users."),
        )
    }

    fn properties(&self) -> Vec<PropertyDescriptor> {
        vec![PropertyDescriptor {
            name: "stateless",
            rust_type: "bool",
            doc: Some("@var bool Whether callers authenticate without a session"),
            value: Some(Value::Bool(self.stateless)),
        }]
    }
}

impl RpcMethods for UserDirectory {
    fn methods(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(
                "action_get_user",
                Some(GET_USER_DOC),
                vec![ParamDescriptor::required("userId")],
            ),
            MethodDescriptor::new(
                "action_find_users",
                Some(FIND_USERS_DOC),
                vec![
                    ParamDescriptor::required("query"),
                    ParamDescriptor::with_default("limit", || json!(20)),
                ],
            ),
            MethodDescriptor::new(
                "action_delete_user",
                Some(DELETE_USER_DOC),
                vec![ParamDescriptor::required("userId")],
            ),
            MethodDescriptor::new("action_stats", Some(STATS_DOC), Vec::new()),
        ]
    }

    fn invoke(&self, method: &str, ctx: &mut CallContext, args: &mut Arguments) -> RpcResult<Value> {
        match method {
            "action_get_user" => {
                let user_id = args.take("userId", None)?;
                self.action_get_user(user_id).into_rpc_value()
            }
            "action_find_users" => {
                let query = args.take("query", None)?;
                let limit = args.take("limit", Some(json!(20)))?;
                self.action_find_users(query, limit).into_rpc_value()
            }
            "action_delete_user" => {
                let user_id = args.take("userId", None)?;
                self.action_delete_user(user_id).into_rpc_value()
            }
            "action_stats" => self.action_stats().into_rpc_value(),
            _ => Err(RpcError::WrongActionType {
                action: ctx.action().to_string(),
            }),
        }
    }

    fn constants(&self) -> Vec<(&'static str, Value)> {
        vec![("MAX_PAGE", json!(Self::MAX_PAGE))]
    }

    fn source_text(&self) -> &'static str {
        SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_contracts_extract() {
        let service = UserDirectory::new();
        for method in service.methods() {
            let contract = method.extract_contract().unwrap();
            assert_eq!(contract.requires_api, method.name != "action_stats");
        }
    }

    #[test]
    fn test_fixture_invoke() {
        let service = UserDirectory::new();
        let mut ctx = CallContext::new("get-user");
        let mut args = Arguments::new();
        args.insert("userId", json!(2));
        let user = service.invoke("action_get_user", &mut ctx, &mut args).unwrap();
        assert_eq!(user["name"], "alice");
    }

    #[test]
    fn test_fixture_stateless_property() {
        assert!(!UserDirectory::new().is_stateless());
        assert!(UserDirectory::new().stateless(true).is_stateless());
    }

    #[test]
    fn test_in_memory_transactions_reject_double_begin() {
        let tx = InMemoryTransactions::new();
        tx.begin().unwrap();
        assert!(tx.begin().is_err());
        tx.rollback().unwrap();
        assert!(tx.rollback().is_err());
    }
}
