//! All-ack total-order delivery (§4.2).
//!
//! State per replica: a min-heap of pending messages keyed by [`Priority`],
//! and an ack-count table. A message is delivered once every replica has
//! acked it; delivery drains the heap head repeatedly since later heap
//! entries may have already accumulated enough acks while earlier ones were
//! still pending.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use kv_types::MessageId;
use tokio::sync::{Mutex, Notify};
use tracing::trace;

use crate::priority::Priority;

/// Sentinel ack count meaning "delivered and final" (§3's ack table
/// invariant).
const DELIVERED: i64 = -1;

struct HeapEntry<T> {
    priority: Priority,
    id: MessageId,
    payload: T,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.id == other.id
    }
}
impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.priority, self.id).cmp(&(other.priority, other.id))
    }
}

struct State<T> {
    heap: BinaryHeap<Reverse<HeapEntry<T>>>,
    acks: HashMap<MessageId, i64>,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            acks: HashMap::new(),
        }
    }
}

/// Coordinates all-ack total-order delivery for one replica.
///
/// `fleet_size` is the number of acks (`N`) required before a message is
/// released.
pub struct TotalOrderDelivery<T> {
    state: Mutex<State<T>>,
    waiters: Mutex<HashMap<MessageId, Arc<Notify>>>,
    fleet_size: i64,
}

impl<T> TotalOrderDelivery<T> {
    pub fn new(fleet_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            waiters: Mutex::new(HashMap::new()),
            fleet_size: fleet_size as i64,
        }
    }

    /// Pushes a newly-arrived message onto the heap, awaiting its acks.
    pub async fn enqueue(&self, id: MessageId, priority: Priority, payload: T) {
        let mut state = self.state.lock().await;
        state.heap.push(Reverse(HeapEntry {
            priority,
            id,
            payload,
        }));
    }

    /// Records one ack for `id`. Drains and returns every message at the
    /// heap head that has now accumulated acks from the whole fleet, in
    /// delivery order.
    pub async fn record_ack(&self, id: MessageId) -> Vec<(MessageId, T)> {
        let mut delivered = Vec::new();
        {
            let mut state = self.state.lock().await;
            *state.acks.entry(id).or_insert(0) += 1;

            loop {
                let Some(Reverse(top)) = state.heap.peek() else {
                    break;
                };
                match state.acks.get(&top.id) {
                    Some(&count) if count == self.fleet_size => {
                        let Reverse(entry) = state.heap.pop().expect("just peeked");
                        state.acks.insert(entry.id, DELIVERED);
                        trace!(id = %entry.id, priority = %entry.priority, "delivering");
                        delivered.push((entry.id, entry.payload));
                    }
                    _ => break,
                }
            }
        }
        for (delivered_id, _) in &delivered {
            self.notify_delivered(*delivered_id).await;
        }
        delivered
    }

    pub async fn is_delivered(&self, id: MessageId) -> bool {
        self.state.lock().await.acks.get(&id) == Some(&DELIVERED)
    }

    /// Suspends until `id` has been delivered (acks[id] == -1).
    pub async fn wait_for_delivery(&self, id: MessageId) {
        loop {
            let notify = self.notify_handle(id).await;
            let notified = notify.notified();
            if self.is_delivered(id).await {
                return;
            }
            notified.await;
        }
    }

    /// Like [`wait_for_delivery`](Self::wait_for_delivery), but gives up
    /// after `timeout` instead of waiting forever. Returns `false` on
    /// expiry — protocol starvation on a stuck ack (§9) is surfaced to the
    /// caller rather than hanging the connection indefinitely.
    pub async fn wait_for_delivery_timeout(&self, id: MessageId, timeout: std::time::Duration) -> bool {
        let delivered = tokio::time::timeout(timeout, self.wait_for_delivery(id)).await.is_ok();
        if !delivered {
            trace!(%id, ?timeout, "ack wait timed out");
        }
        delivered
    }

    async fn notify_handle(&self, id: MessageId) -> Arc<Notify> {
        self.waiters
            .lock()
            .await
            .entry(id)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    async fn notify_delivered(&self, id: MessageId) {
        if let Some(notify) = self.waiters.lock().await.remove(&id) {
            notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use kv_types::ReplicaId;

    use super::*;

    #[tokio::test]
    async fn delivers_only_after_all_acks_observed() {
        let delivery = TotalOrderDelivery::new(3);
        let id = MessageId::new(1);
        delivery
            .enqueue(id, Priority::new(100, ReplicaId::new(0)), "payload")
            .await;

        assert!(delivery.record_ack(id).await.is_empty());
        assert!(delivery.record_ack(id).await.is_empty());
        let delivered = delivery.record_ack(id).await;
        assert_eq!(delivered, vec![(id, "payload")]);
        assert!(delivery.is_delivered(id).await);
    }

    #[tokio::test]
    async fn drains_later_heads_once_unblocked() {
        let delivery = TotalOrderDelivery::new(2);
        let low = MessageId::new(1);
        let high = MessageId::new(2);
        delivery
            .enqueue(low, Priority::new(10, ReplicaId::new(0)), "low")
            .await;
        delivery
            .enqueue(high, Priority::new(20, ReplicaId::new(0)), "high")
            .await;

        // high gets both acks first; it must wait behind low in the heap.
        delivery.record_ack(high).await;
        assert!(delivery.record_ack(high).await.is_empty());

        // Once low is fully acked, both drain in priority order.
        delivery.record_ack(low).await;
        let delivered = delivery.record_ack(low).await;
        assert_eq!(delivered, vec![(low, "low"), (high, "high")]);
    }

    #[tokio::test]
    async fn wait_for_delivery_unblocks_on_final_ack() {
        let delivery = Arc::new(TotalOrderDelivery::new(2));
        let id = MessageId::new(7);
        delivery
            .enqueue(id, Priority::new(1, ReplicaId::new(0)), "x")
            .await;

        let waiter = {
            let delivery = delivery.clone();
            tokio::spawn(async move {
                delivery.wait_for_delivery(id).await;
            })
        };

        tokio::task::yield_now().await;
        delivery.record_ack(id).await;
        delivery.record_ack(id).await;

        tokio::time::timeout(std::time::Duration::from_millis(500), waiter)
            .await
            .expect("waiter should unblock")
            .unwrap();
    }
}
