//! # kv-net: the network fabric
//!
//! TCP listen/dial primitives and the delayed, best-effort broadcast
//! fan-out described in §4.1: one independent task per destination, delay
//! scaled exponentially with replica-id distance.

mod error;
mod fabric;
mod peers;

pub use error::NetError;
pub use fabric::{broadcast, dial, listen, send_one_way, send_request};
pub use peers::PeerTable;

// re-exported so downstream crates don't need a direct tokio dependency
// just to name the connection type.
pub use tokio::net::{TcpListener, TcpStream};
