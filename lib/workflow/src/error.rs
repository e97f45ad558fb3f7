//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GraphError`: Low-level checks over a built graph
//! - `ConstructionError`: Invariant violations while building a graph
//!
//! Locally anomalous input (dangling connections, illegal loop crossings,
//! unparsable condition lists) is not an error. Those connections are
//! logged and dropped so the rest of the graph still builds.

use dagwire_core::{BlockId, NodeId};
use std::fmt;

/// Errors from checks over a built graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// The graph contains a cycle that is not a loop-back edge.
    CycleDetected,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => {
                write!(f, "node not found: {node_id}")
            }
            Self::CycleDetected => write!(f, "graph contains cycles outside loop-back edges"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors that abort building an execution graph.
///
/// These signal that the node allocator and the edge constructor disagree
/// about the shape of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// A parallel construct was referenced but has no config in the DAG.
    ParallelConfigNotFound { parallel_id: BlockId },
    /// A loop construct was referenced but has no config in the DAG.
    LoopConfigNotFound { loop_id: BlockId },
    /// A block is listed as a parallel member but no parallel config in
    /// the DAG contains it.
    UnknownParallelMember { block_id: BlockId },
    /// A direct edge joins members of two different parallel constructs.
    ///
    /// Only raised when strict parallel edges are enabled.
    CrossParallelEdge {
        source: BlockId,
        target: BlockId,
        source_parallel: BlockId,
        target_parallel: BlockId,
    },
    /// A check over the finished graph failed.
    Graph(GraphError),
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParallelConfigNotFound { parallel_id } => {
                write!(f, "parallel config not found: {parallel_id}")
            }
            Self::LoopConfigNotFound { loop_id } => {
                write!(f, "loop config not found: {loop_id}")
            }
            Self::UnknownParallelMember { block_id } => {
                write!(f, "block {block_id} is a parallel member without a parallel config")
            }
            Self::CrossParallelEdge {
                source,
                target,
                source_parallel,
                target_parallel,
            } => {
                write!(
                    f,
                    "edge {source} -> {target} joins parallel {source_parallel} to parallel {target_parallel}"
                )
            }
            Self::Graph(err) => write!(f, "graph check failed: {err}"),
        }
    }
}

impl std::error::Error for ConstructionError {}

impl From<GraphError> for ConstructionError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}
