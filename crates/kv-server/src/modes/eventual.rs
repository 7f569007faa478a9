//! Eventual replica (§4.4): local apply then best-effort, unordered
//! broadcast. No versioning, no waiting.

use std::sync::Arc;

use kv_net::PeerTable;
use kv_store::{LocalStore, MemoryStore};
use kv_types::{MessageId, Op, ReplicaId, Value};
use kv_wire::WireMessage;
use tracing::instrument;

use crate::delays::{EVENTUAL_WRITE_BASE_DELAY, EVENTUAL_WRITE_INCLUDE_SELF};
use crate::replica::Replica;

pub struct EventualReplica {
    id: ReplicaId,
    peers: PeerTable,
    store: MemoryStore,
}

impl EventualReplica {
    pub fn new(id: ReplicaId, peers: PeerTable) -> Arc<Self> {
        Arc::new(Self {
            id,
            peers,
            store: MemoryStore::new(),
        })
    }
}

impl Replica for EventualReplica {
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
                self.store.set_value(key.clone(), value.clone()).await;

                let mut stamped = request.clone();
                stamped.id = Some(id.to_string());
                stamped.timestamp = Some(timestamp_ms.to_string());
                if let Ok(bytes) = kv_wire::encode(&stamped) {
                    kv_net::broadcast(
                        bytes,
                        self.id,
                        &self.peers,
                        EVENTUAL_WRITE_INCLUDE_SELF,
                        EVENTUAL_WRITE_BASE_DELAY,
                    );
                }

                WireMessage::response_value(&value, None)
            }
            Op::Get => {
                let current = self.store.get(&key).await;
                let value = current.map(|vv| vv.value).unwrap_or_else(Value::nil);
                WireMessage::response_value(&value, None)
            }
        }
    }

    async fn handle_peer(&self, message: WireMessage) {
        if message.op().ok() != Some(Op::Set) {
            return;
        }
        if let (Ok(key), Ok(value)) = (message.key(), message.value()) {
            self.store.set_value(key, value).await;
        }
    }

    async fn flush(&self) {
        self.store.flush().await;
    }
}
