//! End-to-end graph construction.

use super::{ConstructionOptions, EdgeConstructor, NodeAllocator, ReachabilityAnalyzer};
use crate::definition::SerializedWorkflow;
use crate::error::ConstructionError;
use crate::graph::Dag;
use dagwire_core::{NodeId, Result};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Builds execution graphs from serialized workflows.
#[derive(Debug, Clone, Default)]
pub struct DagBuilder {
    options: ConstructionOptions,
}

impl DagBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(options: ConstructionOptions) -> Self {
        Self { options }
    }

    /// Builds the execution graph of a workflow.
    ///
    /// `pause_trigger_mapping` is empty for a fresh run. When resuming a
    /// paused run it maps each paused block to the trigger node that
    /// carries its response.
    ///
    /// # Errors
    ///
    /// Returns an error if edge wiring hits an invariant violation, or if
    /// cycle checking is enabled and the graph has a forward cycle.
    #[instrument(
        skip_all,
        fields(
            blocks = workflow.blocks.len(),
            resumed = !pause_trigger_mapping.is_empty()
        )
    )]
    pub fn build(
        &self,
        workflow: &SerializedWorkflow,
        pause_trigger_mapping: &HashMap<NodeId, NodeId>,
    ) -> Result<Dag, ConstructionError> {
        let reachable = ReachabilityAnalyzer::reachable_blocks(workflow);
        let blocks_in_loops = workflow.blocks_in_loops();
        let blocks_in_parallels = workflow.blocks_in_parallels();

        let mut dag = NodeAllocator::allocate(workflow, &reachable);
        EdgeConstructor::new(self.options).execute(
            workflow,
            &mut dag,
            &blocks_in_parallels,
            &blocks_in_loops,
            &reachable,
            pause_trigger_mapping,
        )?;

        if self.options.verify_acyclic {
            dag.validate().map_err(ConstructionError::from)?;
        }

        info!(
            nodes = dag.node_count(),
            edges = dag.edge_count(),
            entry_nodes = dag.entry_nodes().len(),
            "built execution graph"
        );
        Ok(dag)
    }
}
