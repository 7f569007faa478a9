//! Causal replica (§4.3): writes carry an optional single-predecessor
//! dependency; a peer delivering a dependent write blocks until that
//! predecessor is locally visible.

use std::sync::Arc;

use kv_delivery::VersionGate;
use kv_net::PeerTable;
use kv_store::{LocalStore, MemoryStore};
use kv_types::{MessageId, Op, ReplicaId, Value, Version};
use kv_wire::WireMessage;
use tracing::instrument;

use crate::delays::{CAUSAL_WRITE_BASE_DELAY, CAUSAL_WRITE_INCLUDE_SELF, WAIT_TIMEOUT};
use crate::replica::Replica;

pub struct CausalReplica {
    id: ReplicaId,
    peers: PeerTable,
    store: MemoryStore,
    version_gate: VersionGate,
}

impl CausalReplica {
    pub fn new(id: ReplicaId, peers: PeerTable) -> Arc<Self> {
        Arc::new(Self {
            id,
            peers,
            store: MemoryStore::new(),
            version_gate: VersionGate::new(),
        })
    }
}

impl Replica for CausalReplica {
    fn id(&self) -> ReplicaId {
        self.id
    }

    #[instrument(skip_all, fields(replica = %self.id, %id))]
    async fn handle_client(&self, request: WireMessage, id: MessageId, timestamp_ms: u64) -> WireMessage {
        let Ok(op) = request.op() else {
            return WireMessage::client_error();
        };
        let Ok(key) = request.key() else {
            return WireMessage::response_error("missing key");
        };

        match op {
            Op::Set => {
                let Ok(value) = request.value() else {
                    return WireMessage::response_error("missing value");
                };
                // Local apply happens before the broadcast: the client reply
                // follows local apply and precedes peer delivery (§5).
                let new_version = self.store.set(key.clone(), value.clone()).await;
                self.version_gate.signal(&key).await;

                let dependency = request.dependency().ok().flatten();
                let mut stamped = WireMessage::request_set(&key, &value, dependency.as_ref());
                stamped.id = Some(id.to_string());
                stamped.timestamp = Some(timestamp_ms.to_string());

                if let Ok(bytes) = kv_wire::encode(&stamped) {
                    // Coordinator excludes itself: it already applied the
                    // write above and must not apply it again on delivery
                    // (§4.3, §9's resolved double-increment question).
                    kv_net::broadcast(
                        bytes,
                        self.id,
                        &self.peers,
                        CAUSAL_WRITE_INCLUDE_SELF,
                        CAUSAL_WRITE_BASE_DELAY,
                    );
                }

                WireMessage::response_value(&value, Some(new_version))
            }
            Op::Get => {
                let min_version = request.min_version().unwrap_or(Version::ZERO);
                match self
                    .version_gate
                    .wait_until_timeout(&self.store, &key, min_version, WAIT_TIMEOUT)
                    .await
                {
                    Ok(Some(vv)) => WireMessage::response_value(&vv.value, Some(vv.version)),
                    Ok(None) => WireMessage::response_value(&Value::nil(), Some(Version::ZERO)),
                    Err(_) => WireMessage::response_error("request timed out waiting for minVersion"),
                }
            }
        }
    }

    async fn handle_peer(&self, message: WireMessage) {
        if message.op().ok() != Some(Op::Set) {
            return;
        }
        let (Ok(key), Ok(value)) = (message.key(), message.value()) else {
            return;
        };

        if let Ok(Some(dependency)) = message.dependency() {
            let _ = self
                .version_gate
                .wait_until_timeout(&self.store, &dependency.key, dependency.version, WAIT_TIMEOUT)
                .await;
        }

        self.store.set(key.clone(), value).await;
        self.version_gate.signal(&key).await;
    }

    async fn flush(&self) {
        self.store.flush().await;
    }
}
