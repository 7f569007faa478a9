//! # kv-wire: the flat JSON wire protocol
//!
//! Everything shared between a client and a replica, and between replicas
//! themselves, passes through [`WireMessage`]. See `codec` for the framing
//! (one JSON object per connection, a configured size cap).

mod codec;
mod error;
mod message;

pub use codec::{decode, encode};
pub use error::WireError;
pub use message::{WireMessage, CLIENT_ERROR};
