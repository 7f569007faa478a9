mod causal;
mod eventual;
mod linearizable;
mod sequential;

pub use causal::CausalReplica;
pub use eventual::EventualReplica;
pub use linearizable::LinearizableReplica;
pub use sequential::SequentialReplica;
