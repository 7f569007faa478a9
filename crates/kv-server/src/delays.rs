//! Named broadcast-delay constants, carried over from the original
//! implementation's per-mode magic numbers (`examples/original_source/services/*.go`).
//! Each is a base for `base_delay ^ distance(from, to)` milliseconds (§4.1).

/// Linearizable mode broadcasts both the stamped request itself (to every
/// replica's PQ, including its own) and the acks synthesized in response,
/// both at this delay, both including self.
pub const LINEARIZABLE_BASE_DELAY: u64 = 5;
pub const LINEARIZABLE_INCLUDE_SELF: bool = true;

/// Sequential mode broadcasts stamped writes and acks at this delay,
/// including self.
pub const SEQUENTIAL_BASE_DELAY: u64 = 1;
pub const SEQUENTIAL_INCLUDE_SELF: bool = true;

/// Causal write broadcast: excludes the sender — the coordinator already
/// applied the write locally and must not deliver it to itself again
/// (§4.3, §9's resolved double-increment question).
pub const CAUSAL_WRITE_BASE_DELAY: u64 = 8;
pub const CAUSAL_WRITE_INCLUDE_SELF: bool = false;

/// Eventual write broadcast: excludes the sender, for the same reason.
pub const EVENTUAL_WRITE_BASE_DELAY: u64 = 5;
pub const EVENTUAL_WRITE_INCLUDE_SELF: bool = false;

/// Deadline for an ack-wait or dependency-wait before it is surfaced to the
/// client as a timeout rather than left to hang (§9's "protocol starvation"
/// recommendation). The source system waits indefinitely; this is the
/// chosen alternative (a) from §9's open question.
pub const WAIT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
