use std::time::Instant;

use log::info;

use crate::{
    collective::Collective,
    config::TrainerConfig,
    data::{NodeLoader, NodeSplit, equalize},
    error::Result,
    graph::{GraphAccess, NeighborSampler},
    metrics::{EpochMetrics, Throughput, TrainMetrics},
    model::ModelRunner,
};

/// Orchestrates one worker's training run.
///
/// Design:
/// - Splits the shared masks into this worker's even share.
/// - Equalizes the batch count across the group once, up front, so every
///   worker issues the same number of loop iterations and barriers.
/// - Walks shuffled mini-batches, delegating sampling to the graph seam
///   and the optimization step to the model seam.
/// - Synchronizes with the rest of the group after every evaluation pass.
pub struct TrainLoop<G, M> {
    cfg: TrainerConfig,
    graph: G,
    runner: M,
    sampler: NeighborSampler,
}

impl<G, M> TrainLoop<G, M>
where
    G: GraphAccess,
    M: ModelRunner,
{
    pub fn new(cfg: TrainerConfig, graph: G, runner: M) -> Self {
        cfg.validate();
        let sampler = NeighborSampler::new(cfg.fanouts.clone());

        Self {
            cfg,
            graph,
            runner,
            sampler,
        }
    }

    /// Runs the full training schedule over `group`.
    ///
    /// # Returns
    /// The run totals on graceful completion.
    ///
    /// # Errors
    /// Returns `TrainerErr` on graph access failures or when the collective
    /// group fails; both are fatal to the run.
    pub async fn run<C: Collective>(mut self, group: &mut C) -> Result<TrainMetrics> {
        let rank = group.rank();
        debug_assert_eq!(group.world_size(), self.cfg.world_size.get());

        let split = NodeSplit::new(rank, self.cfg.world_size);
        let train_nids = split.split_mask(self.graph.train_mask());
        let val_nids = split.split_mask(self.graph.val_mask());
        let test_nids = split.split_mask(self.graph.test_mask());

        info!(
            "part {rank}: train {}, val {}, test {}",
            train_nids.len(),
            val_nids.len(),
            test_nids.len()
        );

        let train_nids = equalize(group, &train_nids).await?;

        let shuffle_seed = self.cfg.seed.unwrap_or_default().wrapping_add(rank as u64);
        let mut loader = NodeLoader::new(train_nids, self.cfg.batch_size.get(), shuffle_seed);

        let mut totals = TrainMetrics::default();
        let mut tput = Throughput::default();

        for epoch in 0..self.cfg.epochs.get() {
            let epoch_start = Instant::now();
            let mut metrics = EpochMetrics::default();
            loader.reset();

            let mut step = 0usize;
            let mut tic = Instant::now();
            while let Some(seeds) = loader.next_batch() {
                let batch = self.sampler.sample_blocks(&mut self.graph, seeds)?;
                let tic_step = Instant::now();
                metrics.sample_time += tic_step - tic;

                let stats = self.runner.train_step(&batch);
                metrics.train_time += tic_step.elapsed();

                metrics.bump_step();
                metrics.add_seeds(stats.seeds);
                metrics.add_inputs(stats.inputs);
                tput.record(stats.seeds, tic.elapsed());

                if step % self.cfg.log_every == 0 {
                    let acc = stats.correct as f32 / stats.seeds.max(1) as f32;
                    info!(
                        "part {} | epoch {:05} | step {:05} | loss {:.4} | acc {:.4} | speed {:.1} seeds/s",
                        rank,
                        epoch,
                        step,
                        stats.loss,
                        acc,
                        tput.mean()
                    );
                }

                step += 1;
                tic = Instant::now();
            }

            info!(
                "part {}, epoch {} time {:.3}s: sample {:.3}s, train {:.3}s, steps {}, seeds {}, inputs {}",
                rank,
                epoch,
                epoch_start.elapsed().as_secs_f64(),
                metrics.sample_time.as_secs_f64(),
                metrics.train_time.as_secs_f64(),
                metrics.steps,
                metrics.seeds,
                metrics.inputs
            );
            totals.absorb(&metrics);

            if (epoch + 1) % self.cfg.eval_every == 0 {
                let val_acc = self.accuracy(&val_nids)?;
                let test_acc = self.accuracy(&test_nids)?;
                info!(
                    "part {rank} | epoch {epoch:05} | val acc {val_acc:.4} | test acc {test_acc:.4}"
                );

                // Evaluation length differs per worker; leave it together.
                group.barrier().await?;
            }
        }

        Ok(totals)
    }

    /// Scores `nids` batch by batch without updating the model.
    fn accuracy(&mut self, nids: &[i64]) -> Result<f32> {
        if nids.is_empty() {
            return Ok(0.0);
        }

        let mut correct = 0u64;
        for chunk in nids.chunks(self.cfg.eval_batch_size.get()) {
            let batch = self.sampler.sample_blocks(&mut self.graph, chunk)?;
            correct += self.runner.evaluate(&batch);
        }

        Ok(correct as f32 / nids.len() as f32)
    }
}
