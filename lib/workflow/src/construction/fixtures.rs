//! Shared helpers for construction tests.

use super::{ConstructionOptions, EdgeConstructor};
use crate::definition::{SerializedBlock, SerializedWorkflow};
use crate::error::ConstructionError;
use crate::graph::Dag;
use crate::node::{DagNode, NodeKind, SentinelPosition};
use crate::subflow::{branch_node_id, sentinel_end_id, sentinel_start_id};
use dagwire_core::{BlockId, NodeId, Result};
use std::collections::{HashMap, HashSet};

pub(crate) fn block(id: &str) -> SerializedBlock {
    SerializedBlock::new(id, "function")
}

pub(crate) fn id_set(ids: &[&str]) -> HashSet<BlockId> {
    ids.iter().map(|id| BlockId::new(*id)).collect()
}

/// Adds plain nodes.
pub(crate) fn add_plain(dag: &mut Dag, ids: &[&str]) {
    for id in ids {
        dag.add_node(DagNode::new(*id));
    }
}

/// Adds `total` branch replicas of every member.
pub(crate) fn add_branches(dag: &mut Dag, parallel_id: &str, members: &[&str], total: usize) {
    for member in members {
        for index in 0..total {
            dag.add_node(DagNode::new(branch_node_id(member, index)).with_kind(
                NodeKind::ParallelBranch {
                    branch_index: index,
                    branch_total: total,
                    parallel_id: BlockId::new(parallel_id),
                    original_block_id: BlockId::new(*member),
                },
            ));
        }
    }
}

/// Adds both sentinels of a loop.
pub(crate) fn add_sentinels(dag: &mut Dag, loop_id: &str) {
    for (id, position) in [
        (sentinel_start_id(loop_id), SentinelPosition::Start),
        (sentinel_end_id(loop_id), SentinelPosition::End),
    ] {
        dag.add_node(DagNode::new(id).with_kind(NodeKind::LoopSentinel {
            loop_id: BlockId::new(loop_id),
            position,
        }));
    }
}

/// Copies the construct configs of a workflow into the DAG.
pub(crate) fn dag_for(workflow: &SerializedWorkflow) -> Dag {
    let mut dag = Dag::new();
    dag.loop_configs = workflow.loops.clone();
    dag.parallel_configs = workflow.parallels.clone();
    dag
}

/// Runs the edge constructor with member sets taken from the workflow and
/// every block reachable.
pub(crate) fn wire(workflow: &SerializedWorkflow, dag: &mut Dag) -> Result<(), ConstructionError> {
    wire_with(workflow, dag, &HashMap::new(), ConstructionOptions::default())
}

pub(crate) fn wire_with(
    workflow: &SerializedWorkflow,
    dag: &mut Dag,
    pause_mapping: &HashMap<NodeId, NodeId>,
    options: ConstructionOptions,
) -> Result<(), ConstructionError> {
    let reachable = workflow.blocks.iter().map(|b| b.id.clone()).collect();
    EdgeConstructor::new(options).execute(
        workflow,
        dag,
        &workflow.blocks_in_parallels(),
        &workflow.blocks_in_loops(),
        &reachable,
        pause_mapping,
    )
}

/// Returns the targets of a node's outgoing edges.
pub(crate) fn targets(dag: &Dag, node_id: &str) -> Vec<String> {
    dag.node(node_id)
        .map(|n| n.targets().map(|t| t.to_string()).collect())
        .unwrap_or_default()
}

/// Returns the sources of a node's incoming edges.
pub(crate) fn sources(dag: &Dag, node_id: &str) -> Vec<String> {
    dag.node(node_id)
        .map(|n| n.incoming_edges.iter().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

/// Returns the source handle of the edge from `source` to `target`.
pub(crate) fn handle_between(dag: &Dag, source: &str, target: &str) -> Option<String> {
    dag.node(source)?
        .outgoing_edges
        .values()
        .find(|e| e.target == target)?
        .source_handle
        .clone()
}
