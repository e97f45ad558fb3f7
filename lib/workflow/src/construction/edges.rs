//! Edge wiring.
//!
//! Given the nodes allocated for a workflow, the edge constructor turns
//! authored connections into DAG edges. Connections between plain blocks
//! map one to one. Connections touching a loop or parallel construct are
//! rewritten onto the synthetic nodes that stand in for it:
//! - a loop is entered through its start sentinel and left through its end
//!   sentinel, which loops back to the start
//! - a parallel is entered through the branch replicas of its entry members
//!   and left from the replicas of its terminal members
//!
//! Wiring runs in three passes over the connections: regular edges, loop
//! sentinels, then parallel boundaries. Anything locally inconsistent
//! (missing nodes, illegal loop crossings, edges between parallels) is
//! logged and skipped. Only a construct referenced without a config aborts
//! construction.

use super::ConstructionOptions;
use super::metadata::EdgeMetadata;
use crate::definition::{Connection, SerializedWorkflow};
use crate::edge::{LOOP_CONTINUE_HANDLE, LOOP_EXIT_HANDLE};
use crate::error::ConstructionError;
use crate::graph::Dag;
use crate::subflow::{
    base_block_id, branch_count, branch_node_id, sentinel_end_id, sentinel_start_id,
};
use dagwire_core::{BlockId, NodeId, Result};
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Wires the edges of an execution graph.
#[derive(Debug, Clone, Default)]
pub struct EdgeConstructor {
    options: ConstructionOptions,
}

impl EdgeConstructor {
    /// Creates an edge constructor.
    #[must_use]
    pub fn new(options: ConstructionOptions) -> Self {
        Self { options }
    }

    /// Wires every edge of `dag` from the workflow's connections.
    ///
    /// `dag` must already hold the nodes allocated for the workflow and the
    /// loop and parallel configs. `pause_trigger_mapping` redirects edges
    /// whose source was replaced by a pause-response trigger on resume.
    ///
    /// # Errors
    ///
    /// Returns an error when a construct is referenced during boundary
    /// wiring but has no config in the DAG, or when strict parallel edges
    /// are enabled and a connection joins two different parallels.
    #[instrument(
        skip_all,
        fields(
            connections = workflow.connections.len(),
            loops = dag.loop_configs.len(),
            parallels = dag.parallel_configs.len(),
        )
    )]
    pub fn execute(
        &self,
        workflow: &SerializedWorkflow,
        dag: &mut Dag,
        blocks_in_parallels: &HashSet<BlockId>,
        blocks_in_loops: &HashSet<BlockId>,
        reachable_blocks: &HashSet<BlockId>,
        pause_trigger_mapping: &HashMap<NodeId, NodeId>,
    ) -> Result<(), ConstructionError> {
        let metadata = EdgeMetadata::from_workflow(workflow);
        let wiring = Wiring {
            options: self.options,
            connections: &workflow.connections,
            handles: metadata.resolve_source_handles(workflow),
            loop_ids: workflow
                .loops
                .keys()
                .chain(dag.loop_configs.keys())
                .cloned()
                .collect(),
            parallel_ids: workflow
                .parallels
                .keys()
                .chain(dag.parallel_configs.keys())
                .cloned()
                .collect(),
            blocks_in_parallels,
            blocks_in_loops,
            reachable_blocks,
            pause_trigger_mapping,
        };

        wiring.wire_regular_edges(dag)?;
        wiring.wire_loop_sentinels(dag);
        wiring.wire_parallel_blocks(dag)?;

        debug!(
            nodes = dag.node_count(),
            edges = dag.edge_count(),
            "wired execution graph edges"
        );
        Ok(())
    }
}

/// Entry and exit members of a loop body, as node IDs.
#[derive(Debug, Default)]
struct LoopBoundary {
    start_nodes: IndexSet<NodeId>,
    terminal_nodes: IndexSet<NodeId>,
}

/// Entry and exit members of a parallel, as block IDs, with its width.
#[derive(Debug)]
struct ParallelBoundary {
    entry_nodes: IndexSet<BlockId>,
    terminal_nodes: IndexSet<BlockId>,
    branch_count: usize,
}

impl ParallelBoundary {
    /// Existing replicas of the entry members, member-major.
    fn entry_branches(&self, dag: &Dag) -> Vec<NodeId> {
        existing_branches(dag, &self.entry_nodes, self.branch_count)
    }

    /// Existing replicas of the terminal members, member-major.
    fn terminal_branches(&self, dag: &Dag) -> Vec<NodeId> {
        existing_branches(dag, &self.terminal_nodes, self.branch_count)
    }
}

fn existing_branches(dag: &Dag, members: &IndexSet<BlockId>, total: usize) -> Vec<NodeId> {
    members
        .iter()
        .flat_map(|member| (0..total).map(move |index| branch_node_id(member.as_str(), index)))
        .filter(|id| dag.contains(id.as_str()))
        .collect()
}

/// Endpoints of a connection after construct redirection.
struct Redirected {
    source: NodeId,
    target: NodeId,
    source_handle: Option<String>,
    /// Start sentinel of a source loop, for the zero-iteration exit.
    exit_from: Option<NodeId>,
}

/// State shared by the wiring passes of one `execute` call.
struct Wiring<'a> {
    options: ConstructionOptions,
    connections: &'a [Connection],
    handles: Vec<Option<String>>,
    loop_ids: HashSet<BlockId>,
    parallel_ids: HashSet<BlockId>,
    blocks_in_parallels: &'a HashSet<BlockId>,
    blocks_in_loops: &'a HashSet<BlockId>,
    reachable_blocks: &'a HashSet<BlockId>,
    pause_trigger_mapping: &'a HashMap<NodeId, NodeId>,
}

impl Wiring<'_> {
    fn is_loop(&self, id: &str) -> bool {
        self.loop_ids.contains(id)
    }

    fn is_parallel(&self, id: &str) -> bool {
        self.parallel_ids.contains(id)
    }

    /// Replaces a source with its pause-response trigger, if it has one.
    fn resolve_source(&self, source: &str) -> NodeId {
        self.pause_trigger_mapping
            .get(source)
            .cloned()
            .unwrap_or_else(|| NodeId::new(source))
    }

    fn connections_with_handles(&self) -> impl Iterator<Item = (&Connection, Option<&str>)> {
        self.connections
            .iter()
            .zip(self.handles.iter().map(Option::as_deref))
    }

    // Regular edges

    fn wire_regular_edges(&self, dag: &mut Dag) -> Result<(), ConstructionError> {
        for (connection, handle) in self.connections_with_handles() {
            let source_is_parallel = self.is_parallel(connection.source.as_str());
            let target_is_parallel = self.is_parallel(connection.target.as_str());
            let touches_loop = self.is_loop(connection.source.as_str())
                || self.is_loop(connection.target.as_str());

            let mut redirected = Redirected {
                source: NodeId::from(&connection.source),
                target: NodeId::from(&connection.target),
                source_handle: handle.map(str::to_string),
                exit_from: None,
            };

            if touches_loop || source_is_parallel || target_is_parallel {
                let Some(endpoints) = self.redirect_loop_endpoints(dag, connection, redirected)
                else {
                    continue;
                };

                if let Some(start) = endpoints.exit_from.as_ref().filter(|_| !target_is_parallel) {
                    self.wire_zero_iteration_exit(dag, start, &endpoints.target, connection);
                }

                if source_is_parallel || target_is_parallel {
                    continue;
                }
                redirected = endpoints;
            }

            let source = redirected.source.as_str();
            let target = redirected.target.as_str();

            if self.crosses_loop_boundary(dag, source, target) {
                debug!(source, target, "skipping edge that crosses a loop boundary");
                continue;
            }

            if !self.is_edge_reachable(dag, source, target) {
                debug!(source, target, "skipping edge to unreachable node");
                continue;
            }

            let source_handle = redirected.source_handle.as_deref();
            let target_handle = connection.target_handle.as_deref();

            match (
                self.blocks_in_parallels.contains(source),
                self.blocks_in_parallels.contains(target),
            ) {
                (true, true) => match (
                    parallel_of(dag, source).cloned(),
                    parallel_of(dag, target).cloned(),
                ) {
                    (Some(source_parallel), Some(target_parallel))
                        if source_parallel == target_parallel =>
                    {
                        self.wire_parallel_internal_edge(
                            dag,
                            &source_parallel,
                            source,
                            target,
                            source_handle,
                            target_handle,
                        )?;
                    }
                    (Some(source_parallel), Some(target_parallel)) => {
                        self.reject_cross_parallel_edge(
                            source,
                            target,
                            source_parallel,
                            target_parallel,
                        )?;
                    }
                    (None, None) => {
                        return Err(ConstructionError::UnknownParallelMember {
                            block_id: BlockId::new(source),
                        }
                        .into());
                    }
                    _ => {
                        warn!(
                            source,
                            target,
                            "only one endpoint belongs to a configured parallel, skipping"
                        );
                    }
                },
                (false, false) => {
                    let resolved = self
                        .pause_trigger_mapping
                        .get(connection.source.as_str())
                        .unwrap_or(&redirected.source);
                    dag.add_edge(resolved.as_str(), target, source_handle, target_handle, false);
                }
                // One side inside a parallel; wired from the construct.
                _ => {}
            }
        }

        Ok(())
    }

    /// Moves the endpoints of a connection onto loop sentinels.
    ///
    /// Returns `None` when a sentinel the connection needs was never
    /// allocated, in which case the connection is dropped.
    fn redirect_loop_endpoints(
        &self,
        dag: &Dag,
        connection: &Connection,
        mut endpoints: Redirected,
    ) -> Option<Redirected> {
        let source = connection.source.as_str();
        let target = connection.target.as_str();

        if self.is_loop(source) {
            let start = sentinel_start_id(source);
            let end = sentinel_end_id(source);
            if !dag.contains(start.as_str()) || !dag.contains(end.as_str()) {
                debug!(loop_id = source, "loop sentinels not allocated, skipping connection");
                return None;
            }
            endpoints.source = end;
            endpoints.source_handle = Some(LOOP_EXIT_HANDLE.to_string());
            endpoints.exit_from = Some(start);
        }

        if self.is_loop(target) {
            let start = sentinel_start_id(target);
            if !dag.contains(start.as_str()) {
                debug!(loop_id = target, "loop sentinels not allocated, skipping connection");
                return None;
            }
            endpoints.target = start;
        }

        Some(endpoints)
    }

    /// Lets a loop that runs zero times fall straight through to its
    /// successor.
    fn wire_zero_iteration_exit(
        &self,
        dag: &mut Dag,
        start: &NodeId,
        target: &NodeId,
        connection: &Connection,
    ) {
        dag.add_edge(
            start.as_str(),
            target.as_str(),
            Some(LOOP_EXIT_HANDLE),
            connection.target_handle.as_deref(),
            false,
        );
    }

    /// Returns whether an edge would enter or leave a loop body directly.
    fn crosses_loop_boundary(&self, dag: &Dag, source: &str, target: &str) -> bool {
        let source_in_loop = self.blocks_in_loops.contains(source);
        let target_in_loop = self.blocks_in_loops.contains(target);

        if source_in_loop != target_in_loop {
            return true;
        }
        if !source_in_loop {
            return false;
        }

        loop_of(dag, source) != loop_of(dag, target)
    }

    fn is_edge_reachable(&self, dag: &Dag, source: &str, target: &str) -> bool {
        let known = |id: &str| self.reachable_blocks.contains(id) || dag.contains(id);
        known(source) && known(target)
    }

    /// Returns the first parallel config that lists a member block.
    fn reject_cross_parallel_edge(
        &self,
        source: &str,
        target: &str,
        source_parallel: BlockId,
        target_parallel: BlockId,
    ) -> Result<(), ConstructionError> {
        if self.options.strict_parallel_edges {
            return Err(ConstructionError::CrossParallelEdge {
                source: BlockId::new(source),
                target: BlockId::new(target),
                source_parallel,
                target_parallel,
            }
            .into());
        }

        warn!(
            source,
            target,
            source_parallel = %source_parallel,
            target_parallel = %target_parallel,
            "edge between different parallels is not supported, skipping"
        );
        Ok(())
    }

    /// Wires a member-to-member edge once per branch.
    fn wire_parallel_internal_edge(
        &self,
        dag: &mut Dag,
        parallel_id: &BlockId,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<(), ConstructionError> {
        let total = branch_count(dag.parallel_configs.get(parallel_id).ok_or_else(|| {
            ConstructionError::ParallelConfigNotFound {
                parallel_id: parallel_id.clone(),
            }
        })?);

        for index in 0..total {
            let source_branch = branch_node_id(source, index);
            let target_branch = branch_node_id(target, index);
            if !dag.contains(source_branch.as_str()) || !dag.contains(target_branch.as_str()) {
                continue;
            }

            let resolved = self.resolve_source(source_branch.as_str());
            dag.add_edge(
                resolved.as_str(),
                target_branch.as_str(),
                source_handle,
                target_handle,
                false,
            );
        }

        Ok(())
    }

    // Loop sentinels

    fn wire_loop_sentinels(&self, dag: &mut Dag) {
        let loops: Vec<(BlockId, Vec<BlockId>)> = dag
            .loop_configs
            .iter()
            .map(|(id, config)| (id.clone(), config.nodes.clone()))
            .collect();

        for (loop_id, members) in loops {
            if members.is_empty() {
                continue;
            }

            let start = sentinel_start_id(loop_id.as_str());
            let end = sentinel_end_id(loop_id.as_str());
            if !dag.contains(start.as_str()) || !dag.contains(end.as_str()) {
                continue;
            }

            let boundary = find_loop_boundary(dag, &members);
            debug!(
                loop_id = %loop_id,
                start_nodes = ?boundary.start_nodes,
                terminal_nodes = ?boundary.terminal_nodes,
                "wiring loop sentinels"
            );

            for node in &boundary.start_nodes {
                dag.add_edge(start.as_str(), node.as_str(), None, None, false);
            }
            for node in &boundary.terminal_nodes {
                dag.add_edge(node.as_str(), end.as_str(), None, None, false);
            }
            dag.add_edge(
                end.as_str(),
                start.as_str(),
                Some(LOOP_CONTINUE_HANDLE),
                None,
                true,
            );
        }
    }

    // Parallel boundaries

    fn wire_parallel_blocks(&self, dag: &mut Dag) -> Result<(), ConstructionError> {
        let parallels: Vec<(BlockId, HashSet<BlockId>)> = dag
            .parallel_configs
            .iter()
            .filter(|(_, config)| !config.nodes.is_empty())
            .map(|(id, config)| (id.clone(), config.nodes.iter().cloned().collect()))
            .collect();

        for (parallel_id, members) in parallels {
            let boundary = find_parallel_boundary(dag, parallel_id.as_str())?;
            info!(
                parallel_id = %parallel_id,
                entry_nodes = ?boundary.entry_nodes,
                terminal_nodes = ?boundary.terminal_nodes,
                branch_count = boundary.branch_count,
                "wiring parallel block edges"
            );

            for (connection, handle) in self.connections_with_handles() {
                if connection.target == parallel_id {
                    self.wire_into_parallel(
                        dag,
                        &parallel_id,
                        &members,
                        &boundary,
                        connection,
                        handle,
                    )?;
                }
                if connection.source == parallel_id {
                    self.wire_out_of_parallel(
                        dag,
                        &parallel_id,
                        &members,
                        &boundary,
                        connection,
                        handle,
                    )?;
                }
            }
        }

        Ok(())
    }

    fn wire_into_parallel(
        &self,
        dag: &mut Dag,
        parallel_id: &BlockId,
        members: &HashSet<BlockId>,
        boundary: &ParallelBoundary,
        connection: &Connection,
        handle: Option<&str>,
    ) -> Result<(), ConstructionError> {
        let source = connection.source.as_str();
        let target_handle = connection.target_handle.as_deref();

        // Wired as the outgoing side of the source parallel.
        if self.is_parallel(source) {
            return Ok(());
        }

        if members.contains(source) {
            warn!(
                parallel_id = %parallel_id,
                source,
                "parallel block is targeted by one of its own members, skipping"
            );
            return Ok(());
        }

        if self.is_loop(source) {
            return self.wire_loop_to_parallel(dag, source, boundary, handle, target_handle);
        }

        for branch in boundary.entry_branches(dag) {
            dag.add_edge(source, branch.as_str(), handle, target_handle, false);
        }
        Ok(())
    }

    fn wire_out_of_parallel(
        &self,
        dag: &mut Dag,
        parallel_id: &BlockId,
        members: &HashSet<BlockId>,
        boundary: &ParallelBoundary,
        connection: &Connection,
        handle: Option<&str>,
    ) -> Result<(), ConstructionError> {
        let target = connection.target.as_str();
        let target_handle = connection.target_handle.as_deref();

        if members.contains(target) {
            warn!(
                parallel_id = %parallel_id,
                target,
                "parallel block targets one of its own members, skipping"
            );
            return Ok(());
        }

        if self.is_parallel(target) {
            return self.wire_parallel_to_parallel(
                dag,
                parallel_id,
                target,
                boundary,
                handle,
                target_handle,
            );
        }

        if self.is_loop(target) {
            return self.wire_parallel_to_loop(dag, target, boundary, handle, target_handle);
        }

        for branch in boundary.terminal_branches(dag) {
            let resolved = self.resolve_source(branch.as_str());
            dag.add_edge(resolved.as_str(), target, handle, target_handle, false);
        }
        Ok(())
    }

    /// Joins every terminal replica of one parallel to every entry replica
    /// of the next.
    fn wire_parallel_to_parallel(
        &self,
        dag: &mut Dag,
        source_parallel: &BlockId,
        target_parallel: &str,
        source_boundary: &ParallelBoundary,
        handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<(), ConstructionError> {
        let target_config = dag.parallel_configs.get(target_parallel).ok_or_else(|| {
            ConstructionError::ParallelConfigNotFound {
                parallel_id: BlockId::new(target_parallel),
            }
        })?;

        if target_config.nodes.is_empty() {
            warn!(
                source_parallel = %source_parallel,
                target_parallel,
                "target parallel has no members, skipping"
            );
            return Ok(());
        }

        let target_boundary = find_parallel_boundary(dag, target_parallel)?;
        let target_branches = target_boundary.entry_branches(dag);
        debug!(
            source_parallel = %source_parallel,
            target_parallel,
            target_entry_nodes = ?target_boundary.entry_nodes,
            "wiring parallel to parallel"
        );

        for branch in source_boundary.terminal_branches(dag) {
            let resolved = self.resolve_source(branch.as_str());
            for target in &target_branches {
                dag.add_edge(resolved.as_str(), target.as_str(), handle, target_handle, false);
            }
        }
        Ok(())
    }

    fn wire_loop_to_parallel(
        &self,
        dag: &mut Dag,
        loop_id: &str,
        boundary: &ParallelBoundary,
        handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<(), ConstructionError> {
        if !dag.loop_configs.contains_key(loop_id) {
            return Err(ConstructionError::LoopConfigNotFound {
                loop_id: BlockId::new(loop_id),
            }
            .into());
        }

        let end = sentinel_end_id(loop_id);
        if !dag.contains(end.as_str()) {
            warn!(loop_id, "loop end sentinel not found, skipping loop to parallel edge");
            return Ok(());
        }

        for branch in boundary.entry_branches(dag) {
            dag.add_edge(end.as_str(), branch.as_str(), handle, target_handle, false);
        }
        Ok(())
    }

    fn wire_parallel_to_loop(
        &self,
        dag: &mut Dag,
        loop_id: &str,
        boundary: &ParallelBoundary,
        handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<(), ConstructionError> {
        if !dag.loop_configs.contains_key(loop_id) {
            return Err(ConstructionError::LoopConfigNotFound {
                loop_id: BlockId::new(loop_id),
            }
            .into());
        }

        let start = sentinel_start_id(loop_id);
        if !dag.contains(start.as_str()) {
            warn!(loop_id, "loop start sentinel not found, skipping parallel to loop edge");
            return Ok(());
        }

        for branch in boundary.terminal_branches(dag) {
            let resolved = self.resolve_source(branch.as_str());
            dag.add_edge(resolved.as_str(), start.as_str(), handle, target_handle, false);
        }
        Ok(())
    }
}

/// Finds the first parallel whose config lists the block.
fn parallel_of<'a>(dag: &'a Dag, block_id: &str) -> Option<&'a BlockId> {
    dag.parallel_configs
        .iter()
        .find(|(_, config)| config.nodes.iter().any(|n| n == block_id))
        .map(|(id, _)| id)
}

/// Returns the last loop config that lists a member block.
fn loop_of<'a>(dag: &'a Dag, block_id: &str) -> Option<&'a BlockId> {
    dag.loop_configs
        .iter()
        .rev()
        .find(|(_, config)| config.nodes.iter().any(|n| n == block_id))
        .map(|(id, _)| id)
}

/// Finds the members of a loop body without an incoming or outgoing edge
/// inside the body.
fn find_loop_boundary(dag: &Dag, members: &[BlockId]) -> LoopBoundary {
    let member_set: HashSet<&str> = members.iter().map(BlockId::as_str).collect();
    let mut boundary = LoopBoundary::default();

    for member in members {
        let Some(node) = dag.node(member.as_str()) else {
            continue;
        };

        if !node
            .incoming_edges
            .iter()
            .any(|source| member_set.contains(source.as_str()))
        {
            boundary.start_nodes.insert(node.id.clone());
        }
        if !node.targets().any(|target| member_set.contains(target.as_str())) {
            boundary.terminal_nodes.insert(node.id.clone());
        }
    }

    boundary
}

/// Finds the entry and terminal members of a parallel from the edges of its
/// branch 0 replicas. Members with no replica at all are ignored.
fn find_parallel_boundary(
    dag: &Dag,
    parallel_id: &str,
) -> Result<ParallelBoundary, ConstructionError> {
    let config = dag.parallel_configs.get(parallel_id).ok_or_else(|| {
        ConstructionError::ParallelConfigNotFound {
            parallel_id: BlockId::new(parallel_id),
        }
    })?;

    let total = branch_count(config);
    let member_set: HashSet<&str> = config.nodes.iter().map(BlockId::as_str).collect();
    let mut entry_nodes = IndexSet::new();
    let mut terminal_nodes = IndexSet::new();

    for member in &config.nodes {
        let has_replica =
            (0..total).any(|index| dag.contains(branch_node_id(member.as_str(), index).as_str()));
        if !has_replica {
            continue;
        }

        let Some(first) = dag.node(branch_node_id(member.as_str(), 0).as_str()) else {
            continue;
        };

        if !first
            .incoming_edges
            .iter()
            .any(|source| member_set.contains(base_block_id(source.as_str())))
        {
            entry_nodes.insert(member.clone());
        }
        if !first
            .targets()
            .any(|target| member_set.contains(base_block_id(target.as_str())))
        {
            terminal_nodes.insert(member.clone());
        }
    }

    Ok(ParallelBoundary {
        entry_nodes,
        terminal_nodes,
        branch_count: total,
    })
}
