//! Implementations of the `dagwire` subcommands.

use crate::error::CliError;
use dagwire_core::NodeId;
use dagwire_workflow::{ConstructionOptions, Dag, DagBuilder, SerializedWorkflow};
use rootcause::Report;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

fn read_input(path: &Path) -> Result<String, Report<CliError>> {
    std::fs::read_to_string(path).map_err(|e| {
        CliError::ReadInput {
            path: path.to_path_buf(),
            details: e.to_string(),
        }
        .into()
    })
}

/// Loads a serialized workflow from a JSON file.
pub fn load_workflow(path: &Path) -> Result<SerializedWorkflow, Report<CliError>> {
    let raw = read_input(path)?;
    let workflow =
        SerializedWorkflow::from_json(&raw).map_err(|e| CliError::InvalidWorkflow {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

    debug!(
        blocks = workflow.blocks.len(),
        connections = workflow.connections.len(),
        "loaded workflow"
    );
    Ok(workflow)
}

/// Loads a pause mapping (`{ "pausedBlock": "responseTrigger", ... }`).
///
/// No path means a fresh run with an empty mapping.
pub fn load_pause_mapping(
    path: Option<&Path>,
) -> Result<HashMap<NodeId, NodeId>, Report<CliError>> {
    let Some(path) = path else {
        return Ok(HashMap::new());
    };

    let raw = read_input(path)?;
    let mapping: HashMap<NodeId, NodeId> =
        serde_json::from_str(&raw).map_err(|e| CliError::InvalidPauseMapping {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

    debug!(entries = mapping.len(), "loaded pause mapping");
    Ok(mapping)
}

/// Builds the execution graph of a workflow file.
#[instrument(skip(options), fields(workflow = %workflow_path.display()))]
pub fn build_dag(
    workflow_path: &Path,
    pause_mapping_path: Option<&Path>,
    options: ConstructionOptions,
) -> Result<Dag, Report<CliError>> {
    let workflow = load_workflow(workflow_path)?;
    let pause_mapping = load_pause_mapping(pause_mapping_path)?;

    DagBuilder::new(options)
        .build(&workflow, &pause_mapping)
        .map_err(|e| {
            CliError::Construction {
                details: e.to_string(),
            }
            .into()
        })
}

/// Renders a DAG as JSON.
pub fn render_json(dag: &Dag, compact: bool) -> Result<String, Report<CliError>> {
    let rendered = if compact {
        serde_json::to_string(dag)
    } else {
        serde_json::to_string_pretty(dag)
    };

    rendered.map_err(|e| {
        CliError::Output {
            details: e.to_string(),
        }
        .into()
    })
}

/// Renders one line per edge, in node allocation order.
///
/// Lines read `source -> target` or `source -[handle]-> target`; loop-back
/// edges end with ` (loop-back)`.
#[must_use]
pub fn render_edges(dag: &Dag) -> String {
    dag.nodes
        .values()
        .flat_map(|node| node.outgoing_edges.values().map(move |edge| (node, edge)))
        .map(|(node, edge)| {
            let arrow = match edge.source_handle.as_deref() {
                Some(handle) => format!("-[{handle}]->"),
                None => "->".to_string(),
            };
            let suffix = if edge.is_loop_back() { " (loop-back)" } else { "" };
            format!("{} {arrow} {}{suffix}\n", node.id, edge.target)
        })
        .collect()
}
