//! Wire-level error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed JSON message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unrecognized op {0:?}")]
    InvalidOp(String),

    #[error("missing required field {0:?}")]
    MissingField(&'static str),

    #[error("field {field:?} is not a valid decimal number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("payload of {size} bytes exceeds the configured limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
}
