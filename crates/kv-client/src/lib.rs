//! # kv-client: the client library (§4.5)
//!
//! A connection handles exactly one request/response exchange; no
//! pipelining. [`Client`] optionally tracks the latest version observed
//! per key, which feeds both the causal `dependency` annotation on writes
//! and the `minVersion` read-your-writes hint on reads.

mod error;

use std::net::SocketAddr;

pub use error::ClientError;
use kv_types::{Dependency, Key, Value, Version};
use kv_wire::WireMessage;
use tokio::sync::Mutex;
use tracing::instrument;

/// A client bound to one replica. Construct one per target replica; a
/// fleet-aware caller simply owns several.
pub struct Client {
    addr: SocketAddr,
    track_version: bool,
    payload_size: usize,
    versions: Mutex<std::collections::HashMap<Key, Version>>,
}

impl Client {
    /// `payload_size` is the fleet's configured wire payload cap (§6); it
    /// bounds the response this client will accept, matching the limit the
    /// server enforces on requests.
    pub fn new(addr: SocketAddr, track_version: bool, payload_size: usize) -> Self {
        Self {
            addr,
            track_version,
            payload_size,
            versions: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Writes `key := value`. Returns the version the server assigned, when
    /// the mode reports one (causal does; eventual/total-order modes may
    /// not).
    #[instrument(skip(self, value), fields(%key))]
    pub async fn write(&self, key: &Key, value: &Value) -> Result<Option<Version>, ClientError> {
        let dependency = self.pick_dependency().await;
        let request = WireMessage::request_set(key, value, dependency.as_ref());
        let response = self.roundtrip(&request).await?;

        if let Some(message) = response.error.clone() {
            return Err(ClientError::Remote(message));
        }
        let version = response.version()?;
        if self.track_version {
            if let Some(version) = version {
                self.versions.lock().await.insert(key.clone(), version);
            }
        }
        Ok(version)
    }

    /// Reads `key`. When version tracking is enabled, attaches the client's
    /// last-seen version for `key` as `minVersion` so the server blocks
    /// until its local copy is at least that fresh.
    #[instrument(skip(self), fields(%key))]
    pub async fn read(&self, key: &Key) -> Result<(Value, Option<Version>), ClientError> {
        let min_version = if self.track_version {
            self.versions.lock().await.get(key).copied()
        } else {
            None
        };
        let request = WireMessage::request_get(key, min_version);
        let response = self.roundtrip(&request).await?;

        if let Some(message) = response.error.clone() {
            return Err(ClientError::Remote(message));
        }
        let value = response.value().map_err(|_| ClientError::MissingValue)?;
        let version = response.version()?;
        if self.track_version {
            if let Some(version) = version {
                self.versions.lock().await.insert(key.clone(), version);
            }
        }
        Ok((value, version))
    }

    /// The source system attaches a single arbitrary prior write as a
    /// dependency — "the first entry observed" when iterating the
    /// per-client version map. Map iteration order is unspecified, so this
    /// is deliberately non-deterministic; §4.3 notes the server-side check
    /// is per-dependency, not order-sensitive, so any choice is sound.
    async fn pick_dependency(&self) -> Option<Dependency> {
        if !self.track_version {
            return None;
        }
        self.versions
            .lock()
            .await
            .iter()
            .next()
            .map(|(key, version)| Dependency::new(key.clone(), *version))
    }

    async fn roundtrip(&self, request: &WireMessage) -> Result<WireMessage, ClientError> {
        let bytes = kv_wire::encode(request)?;
        let response_bytes = kv_net::send_request(self.addr, &bytes).await?;
        Ok(kv_wire::decode(&response_bytes, self.payload_size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dependency_is_none_when_tracking_disabled() {
        let client = Client::new("127.0.0.1:1".parse().unwrap(), false, 4096);
        assert!(client.pick_dependency().await.is_none());
    }

    #[tokio::test]
    async fn dependency_is_none_until_a_version_is_observed() {
        let client = Client::new("127.0.0.1:1".parse().unwrap(), true, 4096);
        assert!(client.pick_dependency().await.is_none());
    }
}
