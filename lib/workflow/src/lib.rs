//! Execution graph construction for dagwire workflows.
//!
//! This crate turns an authored workflow into the DAG an executor runs:
//!
//! - **Definitions**: Serialized blocks, connections, loops and parallels
//! - **Graph Model**: Insertion-ordered nodes with handle-labelled edges
//! - **Subflows**: Loop sentinels and per-branch parallel replicas
//! - **Construction**: Reachability, node allocation and edge wiring,
//!   including pause/resume remapping

pub mod construction;
pub mod definition;
pub mod edge;
pub mod error;
pub mod graph;
pub mod node;
pub mod subflow;

pub use construction::{
    ConditionConfig, ConstructionOptions, DagBuilder, EdgeConstructor, EdgeMetadata,
    NodeAllocator, ReachabilityAnalyzer,
};
pub use definition::{
    Connection, LoopType, ParallelType, SerializedBlock, SerializedLoop, SerializedParallel,
    SerializedWorkflow,
};
pub use edge::DagEdge;
pub use error::{ConstructionError, GraphError};
pub use graph::Dag;
pub use node::{DagNode, NodeKind, SentinelPosition};
