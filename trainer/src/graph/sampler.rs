use std::collections::HashMap;

use super::{Block, GraphAccess, GraphError, SampledBatch};

/// Builds message-passing blocks by expanding seeds through the configured
/// fanouts.
///
/// Expansion starts from the seeds and works outward; the produced stack is
/// ordered outermost first, so a model consumes it front to back while the
/// seeds sit at the destination side of the last block.
#[derive(Debug, Clone)]
pub struct NeighborSampler {
    fanouts: Vec<usize>,
}

impl NeighborSampler {
    pub fn new(fanouts: Vec<usize>) -> Self {
        assert!(!fanouts.is_empty(), "fanouts must be non-empty");
        Self { fanouts }
    }

    /// Number of layers a sampled batch will have.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.fanouts.len()
    }

    /// Expands `seeds` into one block per fanout and fetches the node data
    /// the model needs: feature rows of the outermost inputs, labels of the
    /// seeds.
    pub fn sample_blocks<G: GraphAccess>(
        &self,
        graph: &mut G,
        seeds: &[i64],
    ) -> Result<SampledBatch, GraphError> {
        let mut blocks = Vec::with_capacity(self.fanouts.len());
        let mut layer_seeds = seeds.to_vec();
        let mut frontier = Vec::new();

        for &fanout in &self.fanouts {
            frontier.clear();
            graph.sample_neighbors(&layer_seeds, fanout, &mut frontier)?;

            let block = compact(&layer_seeds, &frontier);
            layer_seeds = block.src_nodes.clone();
            blocks.insert(0, block);
        }

        let input_nodes = blocks[0].src_nodes.clone();

        let mut input_feats = Vec::with_capacity(input_nodes.len() * graph.feature_dim());
        graph.features(&input_nodes, &mut input_feats)?;

        let mut seed_labels = Vec::with_capacity(seeds.len());
        graph.labels(seeds, &mut seed_labels)?;

        Ok(SampledBatch {
            blocks,
            input_nodes,
            seeds: seeds.to_vec(),
            input_feats,
            seed_labels,
        })
    }
}

/// Compacts a sampled frontier into a bipartite block: destinations keep
/// their seed order, unique destinations double as the first sources and
/// new sources follow in first-seen order.
fn compact(seeds: &[i64], frontier: &[(i64, u32)]) -> Block {
    let mut index: HashMap<i64, u32> = HashMap::with_capacity(seeds.len() + frontier.len());
    let mut src_nodes = Vec::with_capacity(seeds.len() + frontier.len());

    for &nid in seeds {
        index.entry(nid).or_insert_with(|| {
            src_nodes.push(nid);
            src_nodes.len() as u32 - 1
        });
    }

    let mut edges = Vec::with_capacity(frontier.len());
    for &(src, dst_idx) in frontier {
        let src_idx = *index.entry(src).or_insert_with(|| {
            src_nodes.push(src);
            src_nodes.len() as u32 - 1
        });
        edges.push((src_idx, dst_idx));
    }

    Block {
        dst_nodes: seeds.to_vec(),
        src_nodes,
        edges,
    }
}
