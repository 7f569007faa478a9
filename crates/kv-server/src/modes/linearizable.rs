//! Linearizable replica (§4.2): total-order broadcast for both reads and
//! writes, ordered by wall-clock timestamp.

use std::sync::Arc;

use kv_delivery::{Priority, TotalOrderDelivery};
use kv_net::PeerTable;
use kv_store::{LocalStore, MemoryStore};
use kv_types::{MessageId, Op, ReplicaId, Value};
use kv_wire::WireMessage;
use tracing::instrument;

use crate::delays::{LINEARIZABLE_BASE_DELAY, LINEARIZABLE_INCLUDE_SELF, WAIT_TIMEOUT};
use crate::replica::Replica;

pub struct LinearizableReplica {
    id: ReplicaId,
    peers: PeerTable,
    store: MemoryStore,
    delivery: TotalOrderDelivery<WireMessage>,
}

impl LinearizableReplica {
    pub fn new(id: ReplicaId, peers: PeerTable, fleet_size: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            peers,
            store: MemoryStore::new(),
            delivery: TotalOrderDelivery::new(fleet_size),
        })
    }

    fn send_ack(&self, original: &WireMessage) {
        let mut ack = original.clone();
        ack.ack = Some("ok".to_owned());
        let Ok(bytes) = kv_wire::encode(&ack) else {
            return;
        };
        kv_net::broadcast(
            bytes,
            self.id,
            &self.peers,
            LINEARIZABLE_INCLUDE_SELF,
            LINEARIZABLE_BASE_DELAY,
        );
    }

    fn parse_priority(raw: &str) -> Option<Priority> {
        let (primary, replica) = raw.split_once('.')?;
        let primary = primary.parse::<u64>().ok()?;
        let replica = replica.parse::<u32>().ok()?;
        Some(Priority::new(primary, ReplicaId::new(replica)))
    }
}

impl Replica for LinearizableReplica {
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

        let priority = Priority::new(timestamp_ms, self.id);
        let mut stamped = request.clone();
        stamped.id = Some(id.to_string());
        stamped.timestamp = Some(timestamp_ms.to_string());
        stamped.total_order_timestamp = Some(priority.to_string());

        let Ok(bytes) = kv_wire::encode(&stamped) else {
            return WireMessage::response_error("failed to encode broadcast message");
        };
        kv_net::broadcast(
            bytes,
            self.id,
            &self.peers,
            LINEARIZABLE_INCLUDE_SELF,
            LINEARIZABLE_BASE_DELAY,
        );

        if !self.delivery.wait_for_delivery_timeout(id, WAIT_TIMEOUT).await {
            return WireMessage::response_error("request timed out waiting for delivery");
        }

        match op {
            Op::Set => {
                let value = request.value().unwrap_or_else(|_| Value::new(""));
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
        if message.is_ack() {
            let Some(id) = message.id.as_deref().and_then(|s| s.parse::<u64>().ok()) else {
                return;
            };
            let delivered = self.delivery.record_ack(MessageId::new(id)).await;
            for (_, payload) in delivered {
                if payload.op().ok() == Some(Op::Set) {
                    if let (Ok(key), Ok(value)) = (payload.key(), payload.value()) {
                        self.store.set_value(key, value).await;
                    }
                }
                // A delivered `get` just unblocks the coordinator's wait; the
                // coordinator reads the store itself once delivery resolves.
            }
            return;
        }

        let Ok(op) = message.op() else { return };
        if !matches!(op, Op::Set | Op::Get) {
            return;
        }
        let Some(id) = message.id.as_deref().and_then(|s| s.parse::<u64>().ok()) else {
            return;
        };
        let Some(priority) = message
            .total_order_timestamp
            .as_deref()
            .and_then(Self::parse_priority)
        else {
            return;
        };

        self.delivery
            .enqueue(MessageId::new(id), priority, message.clone())
            .await;
        self.send_ack(&message);
    }

    async fn flush(&self) {
        self.store.flush().await;
    }
}
