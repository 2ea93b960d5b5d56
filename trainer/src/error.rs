use std::{error::Error, fmt, io};

use crate::graph::GraphError;

/// The trainer module's result type.
pub type Result<T> = std::result::Result<T, TrainerErr>;

/// Trainer runtime failures.
#[derive(Debug)]
pub enum TrainerErr {
    Io(io::Error),
    Graph(GraphError),
    /// The local training set is empty, so the cyclic padding step is
    /// undefined. Raised before any collective call so the rest of the
    /// group is never left waiting on this worker.
    EmptyNodeList {
        rank: usize,
    },
    ReduceLengthMismatch {
        seq: u64,
        got: usize,
        expected: usize,
    },
    UnexpectedMessage {
        seq: u64,
        got: &'static str,
    },
    Rejected {
        detail: String,
    },
}

impl fmt::Display for TrainerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainerErr::Io(e) => write!(f, "io error: {e}"),
            TrainerErr::Graph(e) => write!(f, "graph error: {e}"),
            TrainerErr::EmptyNodeList { rank } => {
                write!(f, "empty local node id list at rank {rank}")
            }
            TrainerErr::ReduceLengthMismatch { seq, got, expected } => write!(
                f,
                "reduced length mismatch at seq {seq}: got {got}, expected {expected}"
            ),
            TrainerErr::UnexpectedMessage { seq, got } => {
                write!(f, "unexpected message at seq {seq}: got {got}")
            }
            TrainerErr::Rejected { detail } => {
                write!(f, "rejected by the coordinator: {detail}")
            }
        }
    }
}

impl Error for TrainerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainerErr::Io(e) => Some(e),
            TrainerErr::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainerErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<GraphError> for TrainerErr {
    fn from(value: GraphError) -> Self {
        Self::Graph(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<TrainerErr> for io::Error {
    fn from(value: TrainerErr) -> Self {
        match value {
            TrainerErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
