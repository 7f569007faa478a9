//! Client-side error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Net(#[from] kv_net::NetError),

    #[error(transparent)]
    Wire(#[from] kv_wire::WireError),

    #[error("server returned an error: {0}")]
    Remote(String),

    #[error("response was missing a value")]
    MissingValue,
}
