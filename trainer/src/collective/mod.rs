mod local;
mod remote;

pub use comms::msg::ReduceOp;
pub use local::LocalGroup;
pub use remote::RemoteGroup;

use crate::error::Result;

/// A group of training processes that can synchronize with each other.
///
/// The equalizer and the training loop only ever talk to this seam, so they
/// run over an in-process group in tests and standalone mode, and over the
/// coordinator in a real deployment.
#[allow(unused)]
#[trait_variant::make(Collective: Send)]
pub trait CollectiveTemplate {
    /// This participant's rank within the group.
    fn rank(&self) -> usize;

    /// Total number of participants.
    fn world_size(&self) -> usize;

    /// Element-wise reduction across every participant.
    ///
    /// Blocks until all of them contribute `values` of the same length under
    /// the same `op`; every participant observes the same result in place.
    /// Participants must issue their collective calls in the same relative
    /// order, or the whole group hangs.
    async fn all_reduce(&mut self, values: &mut [i64], op: ReduceOp) -> Result<()>;

    /// Rendezvous point: no participant continues until all have arrived.
    async fn barrier(&mut self) -> Result<()>;
}
