//! Listen/dial primitives and the delayed broadcast fan-out.

use std::net::SocketAddr;
use std::time::Duration;

use kv_types::ReplicaId;
use tokio::net::{TcpListener, TcpStream};
use tracing::{instrument, warn};

use crate::error::NetError;
use crate::peers::PeerTable;

/// Binds a TCP listener on `addr`.
#[instrument(skip_all, fields(%addr))]
pub async fn listen(addr: SocketAddr) -> Result<TcpListener, NetError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| NetError::BindFailed { addr, source })
}

/// Opens a fresh connection to `addr`. Every logical exchange gets its own
/// connection; the wire protocol has no notion of connection reuse (§9).
#[instrument(skip_all, fields(%addr))]
pub async fn dial(addr: SocketAddr) -> Result<TcpStream, NetError> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| NetError::DialFailed { addr, source })
}

/// Sends `payload` over a brand-new connection to `addr` and closes it
/// without awaiting a reply. Used for one-way peer traffic (broadcasts,
/// acks): the source system's `BroadcastMsg` never reads back from the
/// connections it opens.
pub async fn send_one_way(addr: SocketAddr, payload: &[u8]) -> Result<(), NetError> {
    use tokio::io::AsyncWriteExt;

    let mut stream = dial(addr).await?;
    stream.write_all(payload).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Sends `payload` over a brand-new connection to `addr`, shuts down the
/// write half, then reads the peer's reply until it closes its own end.
/// Used by the client library, where a connection is exactly one
/// request/response exchange (§4.5).
pub async fn send_request(addr: SocketAddr, payload: &[u8]) -> Result<Vec<u8>, NetError> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = dial(addr).await?;
    stream.write_all(payload).await?;
    stream.shutdown().await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}

/// Delivers `payload` to every replica in `peers`, optionally excluding
/// `from`, with a per-destination delay of `base_delay ^ distance(from, to)`
/// milliseconds. Each destination is an independent task, so this function
/// returns as soon as the tasks are spawned — it does not wait for delivery.
///
/// Dial/write failures are swallowed (best-effort delivery, §4.1) but logged
/// at `warn`, surfacing what the source system dropped silently.
pub fn broadcast(
    payload: Vec<u8>,
    from: ReplicaId,
    peers: &PeerTable,
    include_self: bool,
    base_delay: u64,
) {
    for to in peers.ids() {
        if to == from && !include_self {
            continue;
        }
        let Some(addr) = peers.get(to) else {
            continue;
        };
        let payload = payload.clone();
        let distance = from.distance(to);
        let delay_ms = base_delay.saturating_pow(distance);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if let Err(err) = send_one_way(addr, &payload).await {
                warn!(%to, %err, "broadcast leg failed, dropping (best-effort delivery)");
            }
        });
    }
}
