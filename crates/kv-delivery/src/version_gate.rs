//! Per-key version-threshold waiting.
//!
//! Used for two distinct but mechanically identical waits: the causal
//! replica's dependency-wait before applying a peer write (§4.3), and the
//! read-your-writes `minVersion` wait on any `GET` (§4.3, §4.2 linearizable
//! reads reuse the same idea via the ack table instead). Both amount to
//! "block until this key's stored version reaches a threshold"; this type
//! replaces the source system's polling loop with condition signaling
//! (§9's design note).

use std::collections::HashMap;
use std::sync::Arc;

use kv_store::LocalStore;
use kv_types::{Key, Version, VersionedValue};
use tokio::sync::{Mutex, Notify};
use tracing::trace;

#[derive(Default)]
pub struct VersionGate {
    notifies: Mutex<HashMap<Key, Arc<Notify>>>,
}

/// A dependency (or read-your-writes) wait did not resolve before its
/// deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyTimedOut;

impl std::fmt::Display for DependencyTimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dependency wait timed out")
    }
}

impl std::error::Error for DependencyTimedOut {}

impl VersionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call after every local write to `key` so waiters re-check.
    pub async fn signal(&self, key: &Key) {
        if let Some(notify) = self.notifies.lock().await.get(key) {
            notify.notify_waiters();
        }
    }

    /// Blocks until `store`'s value for `key` has version `>= min_version`,
    /// or — when `min_version` is zero and the key is still absent — returns
    /// immediately with `None` (the "nil" read convention, §3).
    pub async fn wait_until<S: LocalStore>(
        &self,
        store: &S,
        key: &Key,
        min_version: Version,
    ) -> Option<VersionedValue> {
        loop {
            let notify = self.handle_for(key).await;
            let notified = notify.notified();

            let current = store.get(key).await;
            let satisfied = match &current {
                Some(vv) => vv.version >= min_version,
                None => min_version == Version::ZERO,
            };
            if satisfied {
                return current;
            }
            notified.await;
        }
    }

    /// Like [`wait_until`](Self::wait_until), but gives up after `timeout`
    /// instead of waiting forever — surfaces a stuck dependency (§9's
    /// "protocol starvation") instead of hanging the connection.
    pub async fn wait_until_timeout<S: LocalStore>(
        &self,
        store: &S,
        key: &Key,
        min_version: Version,
        timeout: std::time::Duration,
    ) -> Result<Option<VersionedValue>, DependencyTimedOut> {
        tokio::time::timeout(timeout, self.wait_until(store, key, min_version))
            .await
            .map_err(|_| {
                trace!(%key, ?min_version, ?timeout, "dependency wait timed out");
                DependencyTimedOut
            })
    }

    async fn handle_for(&self, key: &Key) -> Arc<Notify> {
        self.notifies
            .lock()
            .await
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kv_store::MemoryStore;
    use kv_types::Value;
    use proptest::prelude::*;

    use super::*;

    #[tokio::test]
    async fn absent_key_with_zero_threshold_returns_none_immediately() {
        let gate = VersionGate::new();
        let store = MemoryStore::new();
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            gate.wait_until(&store, &Key::from("x"), Version::ZERO),
        )
        .await
        .expect("should not block");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn wait_unblocks_once_version_satisfied() {
        let gate = Arc::new(VersionGate::new());
        let store = Arc::new(MemoryStore::new());
        let key = Key::from("x");

        let waiter = {
            let gate = gate.clone();
            let store = store.clone();
            let key = key.clone();
            tokio::spawn(async move { gate.wait_until(&*store, &key, Version::new(2)).await })
        };

        tokio::task::yield_now().await;
        store.set(key.clone(), Value::from("1")).await;
        gate.signal(&key).await;
        store.set(key.clone(), Value::from("2")).await;
        gate.signal(&key).await;

        let result = tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("waiter should unblock")
            .unwrap();
        assert_eq!(result.unwrap().version, Version::new(2));
    }

    proptest::proptest! {
        /// A dependency wait must never observe a version below the
        /// threshold it was asked for, no matter how many writes land
        /// before it — the property the causal replica relies on when it
        /// blocks a peer delivery on a dependency's version (§4.3).
        #[test]
        fn wait_until_never_returns_below_its_threshold(total_writes in 1usize..20, threshold in 1usize..20) {
            let threshold = threshold.min(total_writes);
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let gate = VersionGate::new();
                let store = MemoryStore::new();
                let key = Key::from("k");

                for _ in 0..total_writes {
                    store.set(key.clone(), Value::from("v")).await;
                    gate.signal(&key).await;
                }

                let result = gate
                    .wait_until(&store, &key, Version::new(threshold as u64))
                    .await;
                let version = result.expect("threshold writes already landed").version;
                prop_assert!(version >= Version::new(threshold as u64));
                Ok(())
            })?;
        }
    }
}
