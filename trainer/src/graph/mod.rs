mod memory;
mod sampler;

pub use memory::InMemoryGraph;
pub use sampler::NeighborSampler;

use std::fmt;

/// Errors produced while accessing the partitioned graph.
#[derive(Debug)]
pub enum GraphError {
    /// The requested node id is outside the partition's view.
    UnknownNode { nid: i64 },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownNode { nid } => write!(f, "node id {nid} is unknown"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Access to the graph data one worker trains on.
///
/// A `GraphAccess` is responsible only for *providing access* to structure
/// and node data. It does not define:
/// - how frontiers are compacted into message-passing blocks,
/// - how seeds are batched or padded,
/// - anything about models, losses or optimizers.
pub trait GraphAccess: Send {
    /// Total number of nodes in this worker's view.
    fn num_nodes(&self) -> usize;

    /// Width of one node feature row.
    fn feature_dim(&self) -> usize;

    /// Number of label classes.
    fn num_classes(&self) -> usize;

    /// Uniformly samples up to `fanout` incoming neighbors per seed, with
    /// replacement. Pushes `(neighbor id, seed position)` pairs into `out`.
    ///
    /// # Errors
    /// Returns `GraphError::UnknownNode` if a seed is outside the view.
    fn sample_neighbors(
        &mut self,
        seeds: &[i64],
        fanout: usize,
        out: &mut Vec<(i64, u32)>,
    ) -> Result<(), GraphError>;

    /// Copies the feature rows of `nids` into `out`, row-major.
    fn features(&self, nids: &[i64], out: &mut Vec<f32>) -> Result<(), GraphError>;

    /// Copies the labels of `nids` into `out`.
    fn labels(&self, nids: &[i64], out: &mut Vec<i64>) -> Result<(), GraphError>;

    /// Membership masks over the full node range, shared by every worker.
    fn train_mask(&self) -> &[bool];
    fn val_mask(&self) -> &[bool];
    fn test_mask(&self) -> &[bool];
}

/// One bipartite message-passing layer.
///
/// Destination nodes keep their seed order. Sources start with the unique
/// destinations and continue with newly sampled neighbors in first-seen
/// order; edges are `(source index, destination index)` pairs into those
/// two lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub dst_nodes: Vec<i64>,
    pub src_nodes: Vec<i64>,
    pub edges: Vec<(u32, u32)>,
}

impl Block {
    #[inline]
    pub fn num_dst(&self) -> usize {
        self.dst_nodes.len()
    }

    #[inline]
    pub fn num_src(&self) -> usize {
        self.src_nodes.len()
    }
}

/// A fully materialized mini-batch: the block stack plus the node data the
/// model needs at both ends of it.
///
/// `blocks[0]` is the outermost layer; its sources are `input_nodes`. The
/// last block's destinations are the `seeds`.
#[derive(Debug, Clone)]
pub struct SampledBatch {
    pub blocks: Vec<Block>,
    pub input_nodes: Vec<i64>,
    pub seeds: Vec<i64>,
    pub input_feats: Vec<f32>,
    pub seed_labels: Vec<i64>,
}
