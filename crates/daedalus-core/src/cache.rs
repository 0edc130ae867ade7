//! Contract cache.
//!
//! Contracts are extracted lazily on the first call of a method and then
//! served from a [`ContractCacheBackend`] keyed by `(type, method)`. In
//! debug mode every lookup re-extracts and overwrites the cached entry, so
//! doc comment edits show up without a restart of the cache.
//!
//! Concurrent extraction of the same method is harmless: extraction is
//! deterministic and the last write wins.

use crate::contract::MethodContract;
use crate::error::RpcResult;
use crate::service::MethodDescriptor;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time-to-live of a cached contract.
pub const CONTRACT_TTL: Duration = Duration::from_secs(3600);

/// Identity of a cached contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractKey {
    /// Fully qualified type name of the service or attached action.
    pub type_id: String,
    /// Rust method name.
    pub method: String,
}

impl ContractKey {
    /// Creates a key.
    #[must_use]
    pub fn new(type_id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.type_id, self.method)
    }
}

/// Storage for cached contracts. Expiry is the backend's responsibility.
pub trait ContractCacheBackend: Send + Sync + fmt::Debug {
    /// Returns a live entry.
    fn get(&self, key: &ContractKey) -> Option<Arc<MethodContract>>;

    /// Stores an entry, replacing any previous one.
    fn put(&self, key: ContractKey, contract: Arc<MethodContract>, ttl: Duration);

    /// Drops every entry.
    fn clear(&self);
}

#[derive(Debug)]
struct Entry {
    contract: Arc<MethodContract>,
    expires_at: Instant,
}

/// Process-local backend behind a `parking_lot::RwLock`.
#[derive(Debug, Default)]
pub struct MemoryContractCache {
    entries: RwLock<HashMap<ContractKey, Entry>>,
}

impl MemoryContractCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ContractCacheBackend for MemoryContractCache {
    fn get(&self, key: &ContractKey) -> Option<Arc<MethodContract>> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| Arc::clone(&entry.contract))
    }

    fn put(&self, key: ContractKey, contract: Arc<MethodContract>, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .insert(key, Entry { contract, expires_at });
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Contract cache front-end applying the debug-mode and TTL policy.
///
/// # Example
///
/// ```
/// use daedalus_core::cache::ContractCache;
/// use daedalus_core::MethodContract;
///
/// let cache = ContractCache::new();
/// let contract = cache
///     .resolve("app::UserService", "action_ping", || Ok(MethodContract::new("action_ping")))
///     .unwrap();
/// assert_eq!(contract.name, "action_ping");
/// assert!(cache.get("app::UserService", "action_ping").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ContractCache {
    backend: Arc<dyn ContractCacheBackend>,
    ttl: Duration,
    debug: bool,
}

impl ContractCache {
    /// Creates a cache with the in-memory backend and [`CONTRACT_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: Arc::new(MemoryContractCache::new()),
            ttl: CONTRACT_TTL,
            debug: false,
        }
    }

    /// Replaces the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn ContractCacheBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the time-to-live of new entries.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enables debug mode: always re-extract.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns the configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a cached contract.
    #[must_use]
    pub fn get(&self, type_id: &str, method: &str) -> Option<Arc<MethodContract>> {
        self.backend.get(&ContractKey::new(type_id, method))
    }

    /// Stores a contract with an explicit TTL.
    pub fn put(&self, type_id: &str, method: &str, contract: Arc<MethodContract>, ttl: Duration) {
        self.backend.put(ContractKey::new(type_id, method), contract, ttl);
    }

    /// Returns the cached contract, extracting and storing it when absent
    /// or when debug mode is on.
    pub fn resolve<F>(&self, type_id: &str, method: &str, extract: F) -> RpcResult<Arc<MethodContract>>
    where
        F: FnOnce() -> RpcResult<MethodContract>,
    {
        if !self.debug {
            if let Some(contract) = self.get(type_id, method) {
                return Ok(contract);
            }
        }

        let contract = Arc::new(extract()?);
        tracing::debug!(type_id, method, "contract extracted");
        self.put(type_id, method, Arc::clone(&contract), self.ttl);
        Ok(contract)
    }

    /// Resolves the contract of a captured method descriptor.
    pub fn resolve_method(
        &self,
        type_id: &str,
        method: &MethodDescriptor,
    ) -> RpcResult<Arc<MethodContract>> {
        self.resolve(type_id, method.name, || method.extract_contract())
    }

    /// Drops every cached contract.
    pub fn clear(&self) {
        self.backend.clear();
    }
}

impl Default for ContractCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use std::cell::Cell;

    #[test]
    fn test_normal_mode_prefers_cached_entry() {
        let cache = ContractCache::new();
        let calls = Cell::new(0);
        let extract = || {
            calls.set(calls.get() + 1);
            Ok(MethodContract::new("action_x"))
        };

        cache.resolve("T", "action_x", extract).unwrap();
        cache.resolve("T", "action_x", extract).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_debug_mode_always_extracts() {
        let cache = ContractCache::new().with_debug(true);
        let calls = Cell::new(0);
        let extract = || {
            calls.set(calls.get() + 1);
            let mut contract = MethodContract::new("action_x");
            contract.requires_api = calls.get() > 1;
            Ok(contract)
        };

        assert!(!cache.resolve("T", "action_x", extract).unwrap().requires_api);
        assert!(cache.resolve("T", "action_x", extract).unwrap().requires_api);
        assert_eq!(calls.get(), 2);
        assert!(cache.get("T", "action_x").unwrap().requires_api, "overwritten");
    }

    #[test]
    fn test_failed_extraction_not_cached() {
        let cache = ContractCache::new();
        let result = cache.resolve("T", "action_x", || {
            Err(RpcError::NoDocumentation {
                method: "action_x".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(cache.get("T", "action_x").is_none());
    }

    #[test]
    fn test_expired_entries_are_misses() {
        let backend = MemoryContractCache::new();
        let key = ContractKey::new("T", "m");
        backend.put(key.clone(), Arc::new(MethodContract::new("m")), Duration::ZERO);
        assert!(backend.get(&key).is_none());
        assert_eq!(backend.len(), 1);

        backend.put(key.clone(), Arc::new(MethodContract::new("m")), CONTRACT_TTL);
        assert!(backend.get(&key).is_some());
        backend.clear();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_keys_are_per_type() {
        let cache = ContractCache::new();
        cache.put("A", "m", Arc::new(MethodContract::new("m")), CONTRACT_TTL);
        assert!(cache.get("B", "m").is_none());
        assert_eq!(ContractKey::new("A", "m").to_string(), "A::m");
    }
}
