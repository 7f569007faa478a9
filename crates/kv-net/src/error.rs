//! Network fabric error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to dial {addr}: {source}")]
    DialFailed {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}
