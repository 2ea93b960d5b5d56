use crate::graph::SampledBatch;

/// Statistics produced by a single local training step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    pub loss: f32,
    pub correct: u64,
    pub seeds: usize,
    pub inputs: usize,
}

/// The model-side seam of the training loop.
///
/// Forward and backward passes, parameters and the optimizer all live
/// behind this trait; the loop only sequences sampled batches through it.
pub trait ModelRunner: Send {
    /// Runs one optimization step over `batch` and reports its stats.
    fn train_step(&mut self, batch: &SampledBatch) -> StepStats;

    /// Scores `batch` without updating the model, returning the number of
    /// correctly predicted seeds.
    fn evaluate(&self, batch: &SampledBatch) -> u64;
}

/// Reference runner predicting the most frequent training label.
///
/// Keeps the coordination plane runnable end to end without an autodiff
/// backend; a real model plugs in through [`ModelRunner`] instead.
#[derive(Debug, Clone)]
pub struct MajorityClass {
    counts: Vec<u64>,
}

impl MajorityClass {
    /// Creates a runner over `num_classes` labels.
    ///
    /// # Panics
    /// - if `num_classes` is zero
    pub fn new(num_classes: usize) -> Self {
        assert!(num_classes > 0, "num_classes must be > 0");
        Self {
            counts: vec![0; num_classes],
        }
    }

    fn mode(&self) -> i64 {
        self.counts
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(label, _)| label as i64)
            .unwrap_or(0)
    }

    fn count_correct(&self, labels: &[i64]) -> u64 {
        let mode = self.mode();
        labels.iter().filter(|&&label| label == mode).count() as u64
    }
}

impl ModelRunner for MajorityClass {
    fn train_step(&mut self, batch: &SampledBatch) -> StepStats {
        let correct = self.count_correct(&batch.seed_labels);

        for &label in &batch.seed_labels {
            if let Some(count) = self.counts.get_mut(label as usize) {
                *count += 1;
            }
        }

        let total = batch.seed_labels.len();
        let loss = if total > 0 {
            1.0 - correct as f32 / total as f32
        } else {
            0.0
        };

        StepStats {
            loss,
            correct,
            seeds: batch.seeds.len(),
            inputs: batch.input_nodes.len(),
        }
    }

    fn evaluate(&self, batch: &SampledBatch) -> u64 {
        self.count_correct(&batch.seed_labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Block, SampledBatch};

    fn batch_with_labels(labels: Vec<i64>) -> SampledBatch {
        let seeds: Vec<i64> = (0..labels.len() as i64).collect();
        SampledBatch {
            blocks: vec![Block {
                dst_nodes: seeds.clone(),
                src_nodes: seeds.clone(),
                edges: Vec::new(),
            }],
            input_nodes: seeds.clone(),
            seeds,
            input_feats: Vec::new(),
            seed_labels: labels,
        }
    }

    #[test]
    fn learns_the_most_frequent_label() {
        let mut runner = MajorityClass::new(3);

        runner.train_step(&batch_with_labels(vec![2, 2, 1, 2]));
        assert_eq!(runner.mode(), 2);

        let stats = runner.train_step(&batch_with_labels(vec![2, 0]));
        assert_eq!(stats.correct, 1);
        assert_eq!(stats.seeds, 2);
        assert!((stats.loss - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn evaluate_does_not_update_counts() {
        let mut runner = MajorityClass::new(2);
        runner.train_step(&batch_with_labels(vec![1, 1]));

        assert_eq!(runner.evaluate(&batch_with_labels(vec![1, 0, 1])), 2);
        assert_eq!(runner.evaluate(&batch_with_labels(vec![1, 0, 1])), 2);
        assert_eq!(runner.mode(), 1);
    }

    #[test]
    fn labels_outside_the_class_range_are_ignored() {
        let mut runner = MajorityClass::new(2);
        let stats = runner.train_step(&batch_with_labels(vec![5, 1]));

        assert_eq!(stats.seeds, 2);
        assert_eq!(runner.mode(), 1);
    }
}
