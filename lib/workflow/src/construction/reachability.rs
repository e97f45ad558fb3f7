//! Reachability from trigger blocks.

use crate::definition::SerializedWorkflow;
use dagwire_core::BlockId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Determines which blocks a run can reach.
///
/// Traversal starts from every enabled trigger block, or from every
/// enabled block without incoming connections when there are no triggers.
/// A construct reaches all of its members, so blocks inside loops and
/// parallels are reached through the construct ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReachabilityAnalyzer;

impl ReachabilityAnalyzer {
    /// Returns the IDs of all reachable blocks and constructs.
    #[instrument(skip_all, fields(blocks = workflow.blocks.len()))]
    pub fn reachable_blocks(workflow: &SerializedWorkflow) -> HashSet<BlockId> {
        let mut graph: DiGraph<BlockId, ()> = DiGraph::new();
        let mut index: HashMap<BlockId, NodeIndex> = HashMap::new();

        let enabled = workflow.blocks.iter().filter(|b| b.enabled);
        let constructs = workflow.loops.keys().chain(workflow.parallels.keys());
        for id in enabled.map(|b| &b.id).chain(constructs) {
            index
                .entry(id.clone())
                .or_insert_with(|| graph.add_node(id.clone()));
        }

        for connection in &workflow.connections {
            if let (Some(&source), Some(&target)) = (
                index.get(connection.source.as_str()),
                index.get(connection.target.as_str()),
            ) {
                graph.add_edge(source, target, ());
            }
        }

        let memberships = workflow
            .loops
            .values()
            .map(|l| (&l.id, &l.nodes))
            .chain(workflow.parallels.values().map(|p| (&p.id, &p.nodes)));
        for (construct_id, members) in memberships {
            let Some(&construct) = index.get(construct_id.as_str()) else {
                continue;
            };
            for member in members {
                if let Some(&member) = index.get(member.as_str()) {
                    graph.add_edge(construct, member, ());
                }
            }
        }

        let triggers: Vec<NodeIndex> = workflow
            .blocks
            .iter()
            .filter(|b| b.enabled && b.is_trigger())
            .filter_map(|b| index.get(b.id.as_str()).copied())
            .collect();

        let roots = if triggers.is_empty() {
            debug!("no trigger blocks, starting from blocks without incoming connections");
            graph
                .node_indices()
                .filter(|&n| {
                    graph
                        .neighbors_directed(n, petgraph::Direction::Incoming)
                        .next()
                        .is_none()
                })
                .collect()
        } else {
            triggers
        };

        let mut reachable = HashSet::new();
        for root in roots {
            if reachable.contains(&graph[root]) {
                continue;
            }
            let mut bfs = Bfs::new(&graph, root);
            while let Some(node) = bfs.next(&graph) {
                reachable.insert(graph[node].clone());
            }
        }

        debug!(reachable = reachable.len(), "computed reachable blocks");
        reachable
    }
}
