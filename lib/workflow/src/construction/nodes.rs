//! Node allocation.

use crate::definition::SerializedWorkflow;
use crate::graph::Dag;
use crate::node::{DagNode, NodeKind, SentinelPosition};
use crate::subflow::{branch_count, branch_node_id, sentinel_end_id, sentinel_start_id};
use dagwire_core::BlockId;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Creates the nodes of an execution graph, without edges.
///
/// Every enabled, reachable block becomes one node, or one replica per
/// branch when it belongs to a parallel. Every non-empty loop with a
/// reachable member gets a start and an end sentinel. Loop and parallel
/// configs are copied onto the DAG.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeAllocator;

impl NodeAllocator {
    /// Allocates the nodes for a workflow.
    #[instrument(skip_all, fields(blocks = workflow.blocks.len()))]
    pub fn allocate(workflow: &SerializedWorkflow, reachable_blocks: &HashSet<BlockId>) -> Dag {
        let mut dag = Dag::new();
        dag.loop_configs = workflow.loops.clone();
        dag.parallel_configs = workflow.parallels.clone();

        // First parallel listing a block wins.
        let mut parallel_of: HashMap<&str, &BlockId> = HashMap::new();
        for (parallel_id, config) in &workflow.parallels {
            for member in &config.nodes {
                parallel_of.entry(member.as_str()).or_insert(parallel_id);
            }
        }

        for block in &workflow.blocks {
            let id = block.id.as_str();
            if !block.enabled || workflow.is_construct(id) || !reachable_blocks.contains(id) {
                continue;
            }

            let Some(parallel_id) = parallel_of.get(id) else {
                dag.add_node(DagNode::for_block(block.clone()));
                continue;
            };

            let total = workflow.parallels.get(*parallel_id).map_or(0, branch_count);
            for index in 0..total {
                let mut node =
                    DagNode::for_block(block.clone()).with_kind(NodeKind::ParallelBranch {
                        branch_index: index,
                        branch_total: total,
                        parallel_id: (*parallel_id).clone(),
                        original_block_id: block.id.clone(),
                    });
                node.id = branch_node_id(id, index);
                dag.add_node(node);
            }
        }

        for (loop_id, config) in &workflow.loops {
            let has_reachable_member = config
                .nodes
                .iter()
                .any(|member| reachable_blocks.contains(member.as_str()));
            if config.nodes.is_empty()
                || !(has_reachable_member || reachable_blocks.contains(loop_id.as_str()))
            {
                continue;
            }

            for (id, position) in [
                (sentinel_start_id(loop_id.as_str()), SentinelPosition::Start),
                (sentinel_end_id(loop_id.as_str()), SentinelPosition::End),
            ] {
                dag.add_node(DagNode::new(id).with_kind(NodeKind::LoopSentinel {
                    loop_id: loop_id.clone(),
                    position,
                }));
            }
        }

        debug!(nodes = dag.node_count(), "allocated execution graph nodes");
        dag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::fixtures::{block, id_set};
    use crate::definition::{SerializedLoop, SerializedParallel};
    use serde_json::json;

    #[test]
    fn plain_blocks_keep_their_ids() {
        let workflow = SerializedWorkflow::new()
            .with_block(block("a"))
            .with_block(block("b"));

        let dag = NodeAllocator::allocate(&workflow, &id_set(&["a", "b"]));

        let ids: Vec<_> = dag.nodes.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(dag.node("a").unwrap().kind, NodeKind::Plain);
    }

    #[test]
    fn disabled_and_unreachable_blocks_are_skipped() {
        let workflow = SerializedWorkflow::new()
            .with_block(block("a"))
            .with_block(block("off").disabled())
            .with_block(block("island"));

        let dag = NodeAllocator::allocate(&workflow, &id_set(&["a", "off"]));

        assert!(dag.contains("a"));
        assert!(!dag.contains("off"));
        assert!(!dag.contains("island"));
    }

    #[test]
    fn parallel_members_are_replicated() {
        let workflow = SerializedWorkflow::new()
            .with_block(block("x"))
            .with_parallel(SerializedParallel::over_collection(
                "p1",
                ["x"],
                json!(["a", "b", "c"]),
            ));

        let dag = NodeAllocator::allocate(&workflow, &id_set(&["x"]));

        assert!(!dag.contains("x"));
        for index in 0..3 {
            let node = dag.node(branch_node_id("x", index).as_str()).unwrap();
            assert_eq!(
                node.kind,
                NodeKind::ParallelBranch {
                    branch_index: index,
                    branch_total: 3,
                    parallel_id: BlockId::new("p1"),
                    original_block_id: BlockId::new("x"),
                }
            );
            assert_eq!(node.block.as_ref().unwrap().id, "x");
        }
        assert!(dag.parallel_configs.contains_key("p1"));
    }

    #[test]
    fn loops_get_sentinels() {
        let workflow = SerializedWorkflow::new()
            .with_block(block("m"))
            .with_loop(SerializedLoop::new("l1", ["m"]))
            .with_loop(SerializedLoop::new("empty", Vec::<&str>::new()));

        let dag = NodeAllocator::allocate(&workflow, &id_set(&["m"]));

        let start = dag.node("loop-l1-sentinel-start").unwrap();
        assert!(start.is_sentinel());
        assert!(start.block.is_none());
        assert!(dag.contains("loop-l1-sentinel-end"));
        assert!(!dag.contains("loop-empty-sentinel-start"));
        assert_eq!(dag.loop_configs.len(), 2);
    }

    #[test]
    fn unreachable_loop_gets_no_sentinels() {
        let workflow = SerializedWorkflow::new()
            .with_block(block("m"))
            .with_loop(SerializedLoop::new("l1", ["m"]));

        let dag = NodeAllocator::allocate(&workflow, &HashSet::new());

        assert_eq!(dag.node_count(), 0);
    }
}
