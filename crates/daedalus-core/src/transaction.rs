//! Transaction participation.
//!
//! Methods marked `@transaction` run inside a transaction provided by a
//! host-supplied [`TransactionManager`]. The per-call [`TransactionSlot`]
//! remembers whether this call opened the transaction, so that:
//!
//! - an already active transaction is reused, never nested
//! - only the call that opened it commits
//! - rollback can be requested from any failure path, any number of times

use crate::error::{RpcError, RpcResult};
use std::sync::Arc;

/// Host-supplied transaction control (typically a database connection).
///
/// At most one transaction is active at a time per manager.
pub trait TransactionManager: Send + Sync + std::fmt::Debug {
    /// Returns `true` if a transaction is currently open.
    fn is_active(&self) -> bool;

    /// Opens a transaction.
    fn begin(&self) -> anyhow::Result<()>;

    /// Commits the open transaction.
    fn commit(&self) -> anyhow::Result<()>;

    /// Rolls back the open transaction.
    fn rollback(&self) -> anyhow::Result<()>;
}

/// Per-call view of the transaction manager.
#[derive(Debug, Default)]
pub struct TransactionSlot {
    manager: Option<Arc<dyn TransactionManager>>,
    opened_here: bool,
}

impl TransactionSlot {
    /// Creates a slot bound to the given manager.
    #[must_use]
    pub fn new(manager: Arc<dyn TransactionManager>) -> Self {
        Self {
            manager: Some(manager),
            opened_here: false,
        }
    }

    /// Ensures a transaction is open, opening one if none is active.
    ///
    /// Fails when no manager is configured.
    pub fn acquire(&mut self) -> RpcResult<()> {
        let manager = self.manager.as_ref().ok_or_else(|| {
            RpcError::internal("method requires a transaction but no transaction manager is configured")
        })?;

        if manager.is_active() {
            tracing::debug!("reusing active transaction");
            return Ok(());
        }

        manager
            .begin()
            .map_err(|e| RpcError::internal_with_source("failed to begin transaction", e))?;
        self.opened_here = true;
        tracing::debug!("transaction opened");
        Ok(())
    }

    /// Commits the transaction if this call opened it.
    pub fn commit(&mut self) -> RpcResult<()> {
        if !self.opened_here {
            return Ok(());
        }
        self.opened_here = false;

        match &self.manager {
            Some(manager) if manager.is_active() => {
                manager
                    .commit()
                    .map_err(|e| RpcError::internal_with_source("failed to commit transaction", e))?;
                tracing::debug!("transaction committed");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Rolls back any active transaction. Idempotent.
    pub fn rollback(&mut self) {
        self.opened_here = false;
        if let Some(manager) = &self.manager {
            if manager.is_active() {
                match manager.rollback() {
                    Ok(()) => tracing::debug!("transaction rolled back"),
                    Err(e) => tracing::warn!(error = %e, "transaction rollback failed"),
                }
            }
        }
    }

    /// Returns `true` if this call opened the current transaction.
    #[must_use]
    pub const fn opened_here(&self) -> bool {
        self.opened_here
    }

    /// Returns `true` if the manager reports an active transaction.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.manager.as_ref().is_some_and(|m| m.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::InMemoryTransactions;

    #[test]
    fn test_acquire_opens_and_commit_closes() {
        let manager = Arc::new(InMemoryTransactions::new());
        let mut slot = TransactionSlot::new(manager.clone());

        slot.acquire().unwrap();
        assert!(slot.opened_here());
        assert!(manager.is_active());

        slot.commit().unwrap();
        assert!(!manager.is_active());
        assert_eq!(manager.commits(), 1);
    }

    #[test]
    fn test_reuse_does_not_commit() {
        let manager = Arc::new(InMemoryTransactions::new());
        manager.begin().unwrap();

        let mut slot = TransactionSlot::new(manager.clone());
        slot.acquire().unwrap();
        assert!(!slot.opened_here());

        slot.commit().unwrap();
        assert!(manager.is_active(), "outer transaction must stay open");
        assert_eq!(manager.begins(), 1);
        assert_eq!(manager.commits(), 0);
    }

    #[test]
    fn test_rollback_is_idempotent() {
        let manager = Arc::new(InMemoryTransactions::new());
        let mut slot = TransactionSlot::new(manager.clone());
        slot.acquire().unwrap();

        slot.rollback();
        slot.rollback();
        assert!(!manager.is_active());
        assert_eq!(manager.rollbacks(), 1);
    }

    #[test]
    fn test_acquire_without_manager_fails() {
        let mut slot = TransactionSlot::default();
        assert!(slot.acquire().unwrap_err().is_internal());
        slot.rollback();
        assert!(slot.commit().is_ok());
    }
}
