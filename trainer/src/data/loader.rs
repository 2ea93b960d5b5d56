use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Mini-batch iterator over a worker's padded training ids.
///
/// Reshuffles in place at each epoch start and never drops the tail batch,
/// so every id is visited exactly once per epoch and the batch count is
/// `ceil(len / batch_size)` on every worker of an equalized group.
#[derive(Debug, Clone)]
pub struct NodeLoader {
    nids: Vec<i64>,
    batch_size: usize,
    cursor: usize,
    rng: StdRng,
}

impl NodeLoader {
    pub fn new(nids: Vec<i64>, batch_size: usize, seed: u64) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        assert!(!nids.is_empty(), "node id list must be non-empty");

        Self {
            nids,
            batch_size,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of batches one epoch yields.
    #[inline]
    pub fn batches_per_epoch(&self) -> usize {
        self.nids.len().div_ceil(self.batch_size)
    }

    /// Starts a new epoch: reshuffles the ids and rewinds the cursor.
    pub fn reset(&mut self) {
        self.nids.shuffle(&mut self.rng);
        self.cursor = 0;
    }

    /// Returns the next borrowed batch of seed ids, or None if exhausted.
    pub fn next_batch(&mut self) -> Option<&[i64]> {
        if self.cursor >= self.nids.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.nids.len());
        let batch = &self.nids[self.cursor..end];
        self.cursor = end;

        Some(batch)
    }
}
