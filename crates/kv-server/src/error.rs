//! Server-side error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Net(#[from] kv_net::NetError),

    #[error(transparent)]
    Wire(#[from] kv_wire::WireError),

    #[error(transparent)]
    Config(#[from] kv_config::ConfigError),

    #[error("request queue is closed")]
    QueueClosed,
}
