use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{GraphAccess, GraphError};

/// A self-contained synthetic partition for standalone runs and tests.
///
/// Structure and node data are generated deterministically from a seed:
/// every node gets `avg_degree` uniformly drawn incoming neighbors, a
/// uniform feature row and a uniform class label. Masks carve the node
/// range into disjoint train/val/test subsets (60/20/20). Workers built
/// from the same seed observe the same graph, which is what lets them
/// split the masks among themselves.
#[derive(Debug, Clone)]
pub struct InMemoryGraph {
    neighbors: Vec<Vec<i64>>,
    feats: Vec<f32>,
    labels: Vec<i64>,
    feature_dim: usize,
    num_classes: usize,
    train_mask: Vec<bool>,
    val_mask: Vec<bool>,
    test_mask: Vec<bool>,
    rng: StdRng,
}

impl InMemoryGraph {
    /// Generates a synthetic partition.
    ///
    /// # Panics
    /// - if `num_nodes`, `avg_degree`, `feature_dim` or `num_classes` is zero
    pub fn generate(
        num_nodes: usize,
        avg_degree: usize,
        feature_dim: usize,
        num_classes: usize,
        seed: u64,
    ) -> Self {
        assert!(num_nodes > 0, "num_nodes must be > 0");
        assert!(avg_degree > 0, "avg_degree must be > 0");
        assert!(feature_dim > 0, "feature_dim must be > 0");
        assert!(num_classes > 0, "num_classes must be > 0");

        let mut rng = StdRng::seed_from_u64(seed);

        let neighbors = (0..num_nodes)
            .map(|_| {
                (0..avg_degree)
                    .map(|_| rng.random_range(0..num_nodes) as i64)
                    .collect()
            })
            .collect();

        let feats = (0..num_nodes * feature_dim)
            .map(|_| rng.random_range(-1.0f32..1.0))
            .collect();

        let labels = (0..num_nodes)
            .map(|_| rng.random_range(0..num_classes) as i64)
            .collect();

        let train_end = num_nodes * 6 / 10;
        let val_end = num_nodes * 8 / 10;

        let train_mask = (0..num_nodes).map(|i| i < train_end).collect();
        let val_mask = (0..num_nodes)
            .map(|i| (train_end..val_end).contains(&i))
            .collect();
        let test_mask = (0..num_nodes).map(|i| i >= val_end).collect();

        Self {
            neighbors,
            feats,
            labels,
            feature_dim,
            num_classes,
            train_mask,
            val_mask,
            test_mask,
            rng,
        }
    }

    fn check(&self, nid: i64) -> Result<usize, GraphError> {
        let idx = usize::try_from(nid).map_err(|_| GraphError::UnknownNode { nid })?;
        if idx >= self.neighbors.len() {
            return Err(GraphError::UnknownNode { nid });
        }
        Ok(idx)
    }
}

impl GraphAccess for InMemoryGraph {
    fn num_nodes(&self) -> usize {
        self.neighbors.len()
    }

    fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn sample_neighbors(
        &mut self,
        seeds: &[i64],
        fanout: usize,
        out: &mut Vec<(i64, u32)>,
    ) -> Result<(), GraphError> {
        out.reserve(seeds.len() * fanout);

        for (pos, &seed) in seeds.iter().enumerate() {
            let idx = self.check(seed)?;
            let nbrs = &self.neighbors[idx];

            for _ in 0..fanout {
                let pick = nbrs[self.rng.random_range(0..nbrs.len())];
                out.push((pick, pos as u32));
            }
        }

        Ok(())
    }

    fn features(&self, nids: &[i64], out: &mut Vec<f32>) -> Result<(), GraphError> {
        out.reserve(nids.len() * self.feature_dim);

        for &nid in nids {
            let idx = self.check(nid)?;
            let row = &self.feats[idx * self.feature_dim..(idx + 1) * self.feature_dim];
            out.extend_from_slice(row);
        }

        Ok(())
    }

    fn labels(&self, nids: &[i64], out: &mut Vec<i64>) -> Result<(), GraphError> {
        out.reserve(nids.len());

        for &nid in nids {
            let idx = self.check(nid)?;
            out.push(self.labels[idx]);
        }

        Ok(())
    }

    fn train_mask(&self) -> &[bool] {
        &self.train_mask
    }

    fn val_mask(&self) -> &[bool] {
        &self.val_mask
    }

    fn test_mask(&self) -> &[bool] {
        &self.test_mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NeighborSampler;

    #[test]
    fn masks_are_disjoint_and_cover_all_nodes() {
        let graph = InMemoryGraph::generate(50, 4, 8, 3, 1);

        for i in 0..50 {
            let memberships = [
                graph.train_mask()[i],
                graph.val_mask()[i],
                graph.test_mask()[i],
            ];
            assert_eq!(memberships.iter().filter(|m| **m).count(), 1);
        }
        assert_eq!(graph.train_mask().iter().filter(|m| **m).count(), 30);
    }

    #[test]
    fn sampling_respects_fanout_and_positions() {
        let mut graph = InMemoryGraph::generate(20, 3, 4, 2, 2);
        let mut out = Vec::new();

        graph.sample_neighbors(&[0, 5, 5], 4, &mut out).unwrap();

        assert_eq!(out.len(), 12);
        for (i, chunk) in out.chunks(4).enumerate() {
            assert!(chunk.iter().all(|(_, pos)| *pos == i as u32));
        }
    }

    #[test]
    fn unknown_node_is_rejected() {
        let mut graph = InMemoryGraph::generate(10, 2, 4, 2, 3);
        let mut out = Vec::new();

        assert!(graph.sample_neighbors(&[10], 1, &mut out).is_err());
        assert!(graph.features(&[-1], &mut Vec::new()).is_err());
    }

    #[test]
    fn block_stack_wires_inputs_to_seeds() {
        let mut graph = InMemoryGraph::generate(30, 5, 4, 3, 4);
        let sampler = NeighborSampler::new(vec![2, 3]);

        let batch = sampler.sample_blocks(&mut graph, &[1, 2, 3]).unwrap();

        assert_eq!(batch.blocks.len(), 2);
        assert_eq!(batch.blocks[1].dst_nodes, vec![1, 2, 3]);
        assert_eq!(batch.input_nodes, batch.blocks[0].src_nodes);
        assert_eq!(batch.input_feats.len(), batch.input_nodes.len() * 4);
        assert_eq!(batch.seed_labels.len(), 3);

        // The inner layer's sources feed the outer layer's destinations.
        assert_eq!(batch.blocks[0].dst_nodes, batch.blocks[1].src_nodes);
    }
}
