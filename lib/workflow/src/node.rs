//! Execution graph nodes.
//!
//! Each node is one of:
//! - a plain block, keyed by the block's own ID
//! - a replica of a block inside a parallel construct, one per branch
//! - a loop sentinel, marking where a loop body starts or ends

use crate::definition::SerializedBlock;
use crate::edge::DagEdge;
use dagwire_core::{BlockId, NodeId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Which end of a loop body a sentinel marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelPosition {
    /// Entered before each iteration.
    Start,
    /// Reached after each iteration.
    End,
}

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// A block outside any parallel construct.
    #[default]
    Plain,
    /// One branch replica of a block inside a parallel construct.
    ParallelBranch {
        /// Zero-based branch index.
        branch_index: usize,
        /// Number of branches of the construct.
        branch_total: usize,
        /// The parallel construct.
        parallel_id: BlockId,
        /// The replicated block.
        original_block_id: BlockId,
    },
    /// A synthetic loop boundary.
    LoopSentinel {
        /// The loop construct.
        loop_id: BlockId,
        /// Start or end of the body.
        position: SentinelPosition,
    },
}

/// A node in the execution graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagNode {
    /// Node identifier.
    pub id: NodeId,
    /// The block this node executes; absent on sentinels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<SerializedBlock>,
    /// What the node stands for.
    #[serde(default)]
    pub kind: NodeKind,
    /// Outgoing edges keyed by edge ID, in insertion order.
    #[serde(default)]
    pub outgoing_edges: IndexMap<String, DagEdge>,
    /// Sources of incoming edges, excluding loop-back edges.
    #[serde(default)]
    pub incoming_edges: IndexSet<NodeId>,
}

impl DagNode {
    /// Creates a plain node without a block.
    #[must_use]
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            block: None,
            kind: NodeKind::Plain,
            outgoing_edges: IndexMap::new(),
            incoming_edges: IndexSet::new(),
        }
    }

    /// Creates a plain node executing a block.
    #[must_use]
    pub fn for_block(block: SerializedBlock) -> Self {
        let mut node = Self::new(&block.id);
        node.block = Some(block);
        node
    }

    /// Sets the node kind.
    #[must_use]
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the parallel construct this node replicates into, if any.
    #[must_use]
    pub fn parallel_id(&self) -> Option<&BlockId> {
        match &self.kind {
            NodeKind::ParallelBranch { parallel_id, .. } => Some(parallel_id),
            _ => None,
        }
    }

    /// Returns whether this node is a loop sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind, NodeKind::LoopSentinel { .. })
    }

    /// Returns the targets of all outgoing edges, in insertion order.
    pub fn targets(&self) -> impl Iterator<Item = &NodeId> {
        self.outgoing_edges.values().map(|e| &e.target)
    }

    /// Returns whether any outgoing edge points at the given node.
    #[must_use]
    pub fn has_edge_to(&self, target: &str) -> bool {
        self.targets().any(|t| t == target)
    }
}
