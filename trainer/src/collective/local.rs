use std::collections::{HashMap, hash_map::Entry};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Barrier;

use super::{Collective, ReduceOp};
use crate::error::Result;

/// One in-flight in-process reduction round.
struct Round {
    acc: Vec<i64>,
    copied: usize,
}

struct Shared {
    barrier: Barrier,
    rounds: Mutex<HashMap<u64, Round>>,
}

/// One participant's handle into an in-process collective group.
///
/// All handles of a group share a barrier and a table of rounds keyed by
/// call sequence, so a fast participant entering the next reduction can
/// never contaminate the previous one. The last participant to copy a
/// round's result out also retires it.
pub struct LocalGroup {
    rank: usize,
    world_size: usize,
    seq: u64,
    shared: Arc<Shared>,
}

impl LocalGroup {
    /// Creates the handles for a group of `world_size` in-process
    /// participants, one per rank.
    ///
    /// # Panics
    /// - if `world_size` is zero
    pub fn group(world_size: usize) -> Vec<LocalGroup> {
        assert!(world_size > 0, "world_size must be > 0");

        let shared = Arc::new(Shared {
            barrier: Barrier::new(world_size),
            rounds: Mutex::new(HashMap::new()),
        });

        (0..world_size)
            .map(|rank| LocalGroup {
                rank,
                world_size,
                seq: 0,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Collective for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    async fn all_reduce(&mut self, values: &mut [i64], op: ReduceOp) -> Result<()> {
        let seq = self.seq;
        self.seq += 1;

        {
            let mut rounds = self.shared.rounds.lock();
            match rounds.entry(seq) {
                Entry::Vacant(e) => {
                    e.insert(Round {
                        acc: values.to_vec(),
                        copied: 0,
                    });
                }
                Entry::Occupied(mut e) => {
                    let round = e.get_mut();
                    assert_eq!(round.acc.len(), values.len(), "all_reduce length mismatch");
                    for (a, v) in round.acc.iter_mut().zip(values.iter()) {
                        *a = op.combine(*a, *v);
                    }
                }
            }
        }

        self.shared.barrier.wait().await;

        {
            let mut rounds = self.shared.rounds.lock();
            // The merge above inserted the round before any participant could
            // reach the barrier.
            let round = rounds
                .get_mut(&seq)
                .expect("collective round missing after barrier");

            values.copy_from_slice(&round.acc);
            round.copied += 1;

            if round.copied == self.world_size {
                rounds.remove(&seq);
            }
        }

        Ok(())
    }

    async fn barrier(&mut self) -> Result<()> {
        let mut token = [0i64];
        self.all_reduce(&mut token, ReduceOp::Max).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_handle_reduction_is_identity() {
        let mut group = LocalGroup::group(1).remove(0);
        let mut values = [4i64, -2, 9];
        group.all_reduce(&mut values, ReduceOp::Max).await.unwrap();
        assert_eq!(values, [4, -2, 9]);
    }

    #[tokio::test]
    async fn three_handles_agree_on_the_max() {
        let handles = LocalGroup::group(3);
        let inputs = [vec![1i64, 10], vec![5, 2], vec![3, 7]];

        let mut tasks = Vec::new();
        for (mut group, input) in handles.into_iter().zip(inputs) {
            tasks.push(tokio::spawn(async move {
                let mut values = input.clone();
                group.all_reduce(&mut values, ReduceOp::Max).await.unwrap();
                values
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), vec![5, 10]);
        }
    }

    #[tokio::test]
    async fn consecutive_rounds_do_not_bleed() {
        let handles = LocalGroup::group(2);

        let mut tasks = Vec::new();
        for (i, mut group) in handles.into_iter().enumerate() {
            tasks.push(tokio::spawn(async move {
                let mut first = [i as i64];
                group.all_reduce(&mut first, ReduceOp::Sum).await.unwrap();

                let mut second = [10 + i as i64];
                group.all_reduce(&mut second, ReduceOp::Sum).await.unwrap();

                (first[0], second[0])
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), (1, 21));
        }
    }

    #[tokio::test]
    async fn barrier_releases_everyone() {
        let handles = LocalGroup::group(4);

        let mut tasks = Vec::new();
        for mut group in handles {
            tasks.push(tokio::spawn(async move { group.barrier().await }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }
    }
}
