//! # kv-store: the local backend
//!
//! Per §1, the backing store is an opaque, externally linearizable
//! single-key map: `get(k) -> (value, version?) | absent`, `set(k, v)`.
//! This crate defines that interface as [`LocalStore`] and ships the
//! in-memory implementation every replica variant runs against. A durable
//! or externally-hosted backend can implement the same trait without
//! touching the replica logic.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use kv_types::{Key, Value, Version, VersionedValue};
use tokio::sync::Mutex;

/// A single-node, externally-linearizable key-value backend.
///
/// Every method is safe to call concurrently; implementations are
/// responsible for their own internal serialization (the in-memory
/// implementation uses a single mutex, per §5's "single per-replica mutex"
/// guidance applied to the store's own state).
pub trait LocalStore: Send + Sync {
    /// Looks up `key`. Returns `None` if absent — absence is not an error
    /// (§7).
    fn get(&self, key: &Key) -> impl Future<Output = Option<VersionedValue>> + Send;

    /// Unconditionally overwrites `key` with `value`, incrementing its
    /// version, and returns the new version. Used by causal writes, which
    /// need the resulting version to reply to the client (§4.3).
    fn set(&self, key: Key, value: Value) -> impl Future<Output = Version> + Send;

    /// Overwrites `key` with `value` without tracking a version — used by
    /// modes where ordering is reconstructed by the delivery protocol
    /// rather than stored per key (sequential, linearizable) or not
    /// tracked at all (eventual).
    fn set_value(&self, key: Key, value: Value) -> impl Future<Output = ()> + Send;

    /// Releases any resources held by the store. A no-op for the in-memory
    /// implementation; reserved for a durable backend (§6's shutdown hook).
    fn flush(&self) -> impl Future<Output = ()> + Send;
}

/// An in-memory [`LocalStore`], guarded by a single mutex.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<Key, VersionedValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    async fn get(&self, key: &Key) -> Option<VersionedValue> {
        self.inner.lock().await.get(key).cloned()
    }

    async fn set(&self, key: Key, value: Value) -> Version {
        let mut guard = self.inner.lock().await;
        let version = guard
            .get(&key)
            .map(|existing| existing.version.next())
            .unwrap_or(Version::ZERO.next());
        guard.insert(key, VersionedValue::new(value, version));
        version
    }

    async fn set_value(&self, key: Key, value: Value) {
        let mut guard = self.inner.lock().await;
        guard.insert(key, VersionedValue::new(value, Version::ZERO));
    }

    async fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_key_reads_as_none() {
        let store = MemoryStore::new();
        assert!(store.get(&Key::from("x")).await.is_none());
    }

    #[tokio::test]
    async fn set_increments_version_on_repeated_writes() {
        let store = MemoryStore::new();
        let v1 = store.set(Key::from("x"), Value::from("1")).await;
        let v2 = store.set(Key::from("x"), Value::from("2")).await;
        assert_eq!(v1.get(), 1);
        assert_eq!(v2.get(), 2);

        let read = store.get(&Key::from("x")).await.unwrap();
        assert_eq!(read.value, Value::from("2"));
        assert_eq!(read.version, v2);
    }

    #[tokio::test]
    async fn set_value_overwrites_without_tracking_version() {
        let store = MemoryStore::new();
        store.set_value(Key::from("x"), Value::from("a")).await;
        store.set_value(Key::from("x"), Value::from("b")).await;
        let read = store.get(&Key::from("x")).await.unwrap();
        assert_eq!(read.value, Value::from("b"));
    }
}
