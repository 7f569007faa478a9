//! # kv-delivery: delivery protocols
//!
//! [`TotalOrderDelivery`] implements the all-ack priority-queue release
//! rule shared by the linearizable and sequential replicas (§4.2).
//! [`VersionGate`] implements the condition-signaled version-threshold wait
//! used by causal dependency-waiting and by read-your-writes `minVersion`
//! waits (§4.3).

mod delivery;
mod priority;
mod version_gate;

pub use delivery::TotalOrderDelivery;
pub use priority::{LogicalClock, Priority};
pub use version_gate::{DependencyTimedOut, VersionGate};
