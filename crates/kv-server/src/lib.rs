//! # kv-server: replica variants and bootstrap
//!
//! Four consistency-mode replica implementations ([`modes`]) sharing the
//! same listener/worker scaffolding ([`runtime`]), wired up from a
//! [`kv_config::FleetConfig`] by [`bootstrap`].

mod bootstrap;
mod delays;
mod error;
mod modes;
mod replica;
mod runtime;

pub use bootstrap::{start_fleet, start_replica};
pub use error::ServerError;
pub use modes::{CausalReplica, EventualReplica, LinearizableReplica, SequentialReplica};
pub use replica::Replica;
pub use runtime::ReplicaHandle;
