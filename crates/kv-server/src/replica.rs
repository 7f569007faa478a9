//! The per-mode replica contract.
//!
//! Every consistency mode implements the same two entry points; the
//! listener/worker scaffolding in [`crate::runtime`] is identical across
//! modes (§2: "control flow is uniform").

use std::future::Future;

use kv_types::{MessageId, ReplicaId};
use kv_wire::WireMessage;

/// A single consistency-mode server variant.
pub trait Replica: Send + Sync + 'static {
    /// This replica's id (its peer port, per §9).
    fn id(&self) -> ReplicaId;

    /// Handles one stamped client request and produces the response to
    /// write back on the same connection.
    fn handle_client(
        &self,
        request: WireMessage,
        id: MessageId,
        timestamp_ms: u64,
    ) -> impl Future<Output = WireMessage> + Send;

    /// Handles one inbound peer message (a broadcasted write or an ack).
    /// Peer connections are one-way: there is no response to write back.
    fn handle_peer(&self, message: WireMessage) -> impl Future<Output = ()> + Send;

    /// Flushes the backing store. A no-op for the in-memory store; reserved
    /// for a durable backend (§6). Called once during [`crate::ReplicaHandle::shutdown`].
    fn flush(&self) -> impl Future<Output = ()> + Send;
}
