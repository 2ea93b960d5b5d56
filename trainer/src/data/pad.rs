use log::info;

use crate::collective::{Collective, ReduceOp};
use crate::error::{Result, TrainerErr};

/// Pads `nids` by cyclic repetition until its length matches the largest
/// list in the group, so every worker runs the same number of batches and
/// reaches every synchronization point the same number of times.
///
/// The group-wide maximum is agreed via a blocking max-reduction. A worker
/// with an empty list fails before that call, so it can never leave the
/// rest of the group waiting on a rendezvous it will not enter. Workers
/// already at the maximum (the largest one, and any tie with it) get their
/// input back unchanged.
pub async fn equalize<C: Collective>(group: &mut C, nids: &[i64]) -> Result<Vec<i64>> {
    if nids.is_empty() {
        return Err(TrainerErr::EmptyNodeList { rank: group.rank() });
    }

    let local_len = nids.len();
    let mut lens = [local_len as i64];
    group.all_reduce(&mut lens, ReduceOp::Max).await?;
    let global_max = lens[0] as usize;

    if global_max <= local_len {
        return Ok(nids.to_vec());
    }

    let repeat_count = global_max / local_len;
    let remainder = global_max % local_len;

    let mut padded = Vec::with_capacity(global_max);
    for _ in 0..repeat_count {
        padded.extend_from_slice(nids);
    }
    padded.extend_from_slice(&nids[..remainder]);

    info!("padding node ids from {local_len} to {global_max}");
    assert_eq!(padded.len(), global_max);

    Ok(padded)
}
