//! Sequential replica (§4.2): total-order broadcast for writes only, using a
//! Lamport-style logical clock; reads are served locally.

use std::sync::Arc;

use kv_delivery::{LogicalClock, Priority, TotalOrderDelivery};
use kv_net::PeerTable;
use kv_store::{LocalStore, MemoryStore};
use kv_types::{MessageId, Op, ReplicaId, Value};
use kv_wire::WireMessage;
use tracing::instrument;

use crate::delays::{SEQUENTIAL_BASE_DELAY, SEQUENTIAL_INCLUDE_SELF, WAIT_TIMEOUT};
use crate::replica::Replica;

pub struct SequentialReplica {
    id: ReplicaId,
    peers: PeerTable,
    store: MemoryStore,
    delivery: TotalOrderDelivery<WireMessage>,
    clock: LogicalClock,
}

impl SequentialReplica {
    pub fn new(id: ReplicaId, peers: PeerTable, fleet_size: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            peers,
            store: MemoryStore::new(),
            delivery: TotalOrderDelivery::new(fleet_size),
            clock: LogicalClock::new(),
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
            SEQUENTIAL_INCLUDE_SELF,
            SEQUENTIAL_BASE_DELAY,
        );
    }
}

impl Replica for SequentialReplica {
    fn id(&self) -> ReplicaId {
        self.id
    }

    #[instrument(skip_all, fields(replica = %self.id, %id))]
    async fn handle_client(&self, request: WireMessage, id: MessageId, _timestamp_ms: u64) -> WireMessage {
        let logical = self.clock.tick();

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
                let priority = Priority::new(logical, self.id);
                let mut stamped = request.clone();
                stamped.id = Some(id.to_string());
                stamped.total_order_timestamp = Some(priority.to_string());

                let Ok(bytes) = kv_wire::encode(&stamped) else {
                    return WireMessage::response_error("failed to encode broadcast message");
                };
                kv_net::broadcast(
                    bytes,
                    self.id,
                    &self.peers,
                    SEQUENTIAL_INCLUDE_SELF,
                    SEQUENTIAL_BASE_DELAY,
                );

                if !self.delivery.wait_for_delivery_timeout(id, WAIT_TIMEOUT).await {
                    return WireMessage::response_error("request timed out waiting for delivery");
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
        if let Some(primary) = message
            .total_order_timestamp
            .as_deref()
            .and_then(|ts| ts.split_once('.'))
            .and_then(|(primary, _)| primary.parse::<u64>().ok())
        {
            self.clock.observe(primary);
        }

        if message.is_ack() {
            let Some(id) = message.id.as_deref().and_then(|s| s.parse::<u64>().ok()) else {
                return;
            };
            let delivered = self.delivery.record_ack(MessageId::new(id)).await;
            for (_, payload) in delivered {
                if let (Ok(key), Ok(value)) = (payload.key(), payload.value()) {
                    self.store.set_value(key, value).await;
                }
            }
            return;
        }

        if message.op().ok() != Some(Op::Set) {
            return;
        }
        let Some(id) = message.id.as_deref().and_then(|s| s.parse::<u64>().ok()) else {
            return;
        };
        let Some(priority) = message
            .total_order_timestamp
            .as_deref()
            .and_then(|ts| ts.split_once('.'))
            .and_then(|(primary, replica)| {
                Some(Priority::new(
                    primary.parse::<u64>().ok()?,
                    ReplicaId::new(replica.parse::<u32>().ok()?),
                ))
            })
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
