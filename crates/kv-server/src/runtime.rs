//! The listener/worker scaffolding shared by all four replica variants.
//!
//! One client-listener task, one peer-listener task, and one request-worker
//! task per replica (§5). Every accepted connection gets its own
//! short-lived task; the client-listener only reads a request and hands it
//! to the worker through a bounded channel, applying natural backpressure
//! when the channel is full.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use kv_net::{TcpListener, TcpStream};
use kv_types::MessageId;
use kv_wire::WireMessage;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::ServerError;
use crate::replica::Replica;

/// Request queue depth (§5: "bounded channel, capacity ~1000").
const REQUEST_QUEUE_CAPACITY: usize = 1000;

struct QueuedRequest {
    message: WireMessage,
    id: MessageId,
    timestamp_ms: u64,
    reply: oneshot::Sender<WireMessage>,
}

type BoxFlush = Box<dyn FnOnce() -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send>;

/// A running replica. Dropping this without calling [`ReplicaHandle::shutdown`]
/// leaves its tasks running — call `shutdown` for a clean stop.
pub struct ReplicaHandle {
    shutdown: Arc<Notify>,
    tasks: Vec<JoinHandle<()>>,
    flush: BoxFlush,
}

impl ReplicaHandle {
    /// Signals all listener/worker tasks to stop, waits for them to finish,
    /// then flushes the backing store. Mirrors the source system's
    /// `Shutdown()`/`KillAll()`, applied to in-process tasks instead of
    /// external processes (§6).
    pub async fn shutdown(mut self) {
        self.shutdown.notify_waiters();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        (self.flush)().await;
    }
}

/// Boots one replica's network-facing tasks against an already-constructed
/// [`Replica`] implementation.
pub async fn spawn<R: Replica>(
    replica: Arc<R>,
    client_addr: SocketAddr,
    peer_addr: SocketAddr,
    payload_size: usize,
) -> Result<ReplicaHandle, ServerError> {
    let client_listener = kv_net::listen(client_addr).await?;
    let peer_listener = kv_net::listen(peer_addr).await?;
    let shutdown = Arc::new(Notify::new());
    let id_counter = Arc::new(AtomicU64::new(1));
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);

    let worker = tokio::spawn(run_worker(replica.clone(), rx, shutdown.clone()));
    let client_task = tokio::spawn(run_client_listener(
        client_listener,
        tx,
        id_counter,
        payload_size,
        shutdown.clone(),
    ));
    let flush_replica = replica.clone();
    let peer_task = tokio::spawn(run_peer_listener(
        replica,
        peer_listener,
        payload_size,
        shutdown.clone(),
    ));

    Ok(ReplicaHandle {
        shutdown,
        tasks: vec![worker, client_task, peer_task],
        flush: Box::new(move || Box::pin(async move { flush_replica.flush().await })),
    })
}

async fn run_worker<R: Replica>(
    replica: Arc<R>,
    mut rx: mpsc::Receiver<QueuedRequest>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            queued = rx.recv() => {
                let Some(queued) = queued else { break };
                let response = replica
                    .handle_client(queued.message, queued.id, queued.timestamp_ms)
                    .await;
                let _ = queued.reply.send(response);
            }
        }
    }
}

async fn run_client_listener(
    listener: TcpListener,
    tx: mpsc::Sender<QueuedRequest>,
    id_counter: Arc<AtomicU64>,
    payload_size: usize,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            accepted = listener.accept() => {
                let Ok((stream, _)) = accepted else { continue };
                let tx = tx.clone();
                let id_counter = id_counter.clone();
                tokio::spawn(serve_client_connection(stream, tx, id_counter, payload_size));
            }
        }
    }
}

#[instrument(skip_all)]
async fn serve_client_connection(
    mut stream: TcpStream,
    tx: mpsc::Sender<QueuedRequest>,
    id_counter: Arc<AtomicU64>,
    payload_size: usize,
) {
    if let Err(err) = serve_client_connection_inner(&mut stream, tx, id_counter, payload_size).await {
        warn!(%err, "client connection failed");
    }
}

async fn serve_client_connection_inner(
    stream: &mut TcpStream,
    tx: mpsc::Sender<QueuedRequest>,
    id_counter: Arc<AtomicU64>,
    payload_size: usize,
) -> Result<(), ServerError> {
    let message = read_one_message(stream, payload_size).await?;

    let id = MessageId::new(id_counter.fetch_add(1, Ordering::SeqCst));
    let timestamp_ms = now_millis();
    let (reply_tx, reply_rx) = oneshot::channel();
    let queued = QueuedRequest {
        message,
        id,
        timestamp_ms,
        reply: reply_tx,
    };

    tx.send(queued).await.map_err(|_| ServerError::QueueClosed)?;
    let response = reply_rx.await.map_err(|_| ServerError::QueueClosed)?;
    write_response(stream, &response).await
}

async fn run_peer_listener<R: Replica>(
    replica: Arc<R>,
    listener: TcpListener,
    payload_size: usize,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            accepted = listener.accept() => {
                let Ok((stream, _)) = accepted else { continue };
                let replica = replica.clone();
                tokio::spawn(serve_peer_connection(replica, stream, payload_size));
            }
        }
    }
}

async fn serve_peer_connection<R: Replica>(replica: Arc<R>, mut stream: TcpStream, payload_size: usize) {
    let message = match read_one_message(&mut stream, payload_size).await {
        Ok(message) => message,
        Err(err) => {
            debug!(%err, "failed to read peer message");
            return;
        }
    };
    replica.handle_peer(message).await;
}

async fn read_one_message(
    stream: &mut TcpStream,
    payload_size: usize,
) -> Result<WireMessage, ServerError> {
    let mut buf = Vec::new();
    stream
        .take(payload_size as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(kv_net::NetError::from)?;
    Ok(kv_wire::decode(&buf, payload_size)?)
}

async fn write_response(stream: &mut TcpStream, response: &WireMessage) -> Result<(), ServerError> {
    let bytes = kv_wire::encode(response)?;
    stream.write_all(&bytes).await.map_err(kv_net::NetError::from)?;
    stream.shutdown().await.map_err(kv_net::NetError::from)?;
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the epoch")
        .as_millis() as u64
}
