//! Execution graph storage.
//!
//! The DAG is an insertion-ordered arena of nodes keyed by node ID. Edges
//! are stored on their source node, and each node records the sources of
//! its incoming edges. Iteration order is the order nodes were allocated,
//! which keeps built graphs reproducible.
//!
//! Loop-back edges (loop end sentinel to start sentinel) make the graph
//! cyclic on purpose; [`Dag::forward_graph`] gives the acyclic view without
//! them.

use crate::definition::{SerializedLoop, SerializedParallel};
use crate::edge::{DagEdge, edge_id};
use crate::error::GraphError;
use crate::node::DagNode;
use dagwire_core::{BlockId, NodeId};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// An execution graph under construction, or ready for an executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dag {
    /// All nodes, in allocation order.
    pub nodes: IndexMap<NodeId, DagNode>,
    /// Loop constructs, authoritative during construction.
    #[serde(default)]
    pub loop_configs: IndexMap<BlockId, SerializedLoop>,
    /// Parallel constructs, authoritative during construction.
    #[serde(default)]
    pub parallel_configs: IndexMap<BlockId, SerializedParallel>,
}

impl Dag {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, replacing any node with the same ID.
    pub fn add_node(&mut self, node: DagNode) -> NodeId {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Returns whether a node with the given ID exists.
    #[must_use]
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Returns a node by ID.
    #[must_use]
    pub fn node(&self, node_id: &str) -> Option<&DagNode> {
        self.nodes.get(node_id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges, loop-back edges included.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.outgoing_edges.len()).sum()
    }

    /// Adds an edge between two existing nodes.
    ///
    /// This is the only way edges are written. A missing endpoint is logged
    /// and nothing is added. An edge with the same ID as an existing one
    /// replaces it in place. Loop-back edges start inactive and are not
    /// recorded in the target's incoming set.
    ///
    /// Returns whether the edge was written.
    pub fn add_edge(
        &mut self,
        source_id: &str,
        target_id: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
        is_loop_back: bool,
    ) -> bool {
        if !self.contains(source_id) || !self.contains(target_id) {
            warn!(source_id, target_id, "edge references non-existent node");
            return false;
        }

        let id = edge_id(source_id, target_id, source_handle);
        let edge = DagEdge {
            target: NodeId::new(target_id),
            source_handle: source_handle.map(str::to_string),
            target_handle: target_handle.map(str::to_string),
            is_active: is_loop_back.then_some(false),
        };

        if let Some(source) = self.nodes.get_mut(source_id) {
            source.outgoing_edges.insert(id, edge);
        }
        if !is_loop_back {
            if let Some(target) = self.nodes.get_mut(target_id) {
                target.incoming_edges.insert(NodeId::new(source_id));
            }
        }
        true
    }

    /// Returns nodes without incoming edges.
    pub fn entry_nodes(&self) -> Vec<&DagNode> {
        self.nodes
            .values()
            .filter(|n| n.incoming_edges.is_empty())
            .collect()
    }

    /// Builds a petgraph view of the graph without loop-back edges.
    ///
    /// Node weights are node IDs; the returned map resolves IDs to indexes.
    #[must_use]
    pub fn forward_graph(&self) -> (DiGraph<NodeId, ()>, HashMap<NodeId, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edge_count());
        let mut index = HashMap::with_capacity(self.nodes.len());

        for id in self.nodes.keys() {
            index.insert(id.clone(), graph.add_node(id.clone()));
        }

        for node in self.nodes.values() {
            let source = index[&node.id];
            for edge in node.outgoing_edges.values() {
                if edge.is_loop_back() {
                    continue;
                }
                if let Some(&target) = index.get(&edge.target) {
                    graph.add_edge(source, target, ());
                }
            }
        }

        (graph, index)
    }

    /// Validates the finished graph.
    ///
    /// Checks:
    /// - Every edge target exists
    /// - No cycles once loop-back edges are removed
    ///
    /// # Errors
    ///
    /// Returns an error describing the first validation failure.
    pub fn validate(&self) -> Result<(), GraphError> {
        for node in self.nodes.values() {
            for edge in node.outgoing_edges.values() {
                if !self.contains(edge.target.as_str()) {
                    return Err(GraphError::NodeNotFound {
                        node_id: edge.target.clone(),
                    });
                }
            }
        }

        let (graph, _) = self.forward_graph();
        if petgraph::algo::is_cyclic_directed(&graph) {
            return Err(GraphError::CycleDetected);
        }

        Ok(())
    }
}
