//! Edge types for execution graphs.
//!
//! Edges live in their source node's outgoing map, keyed by an edge ID
//! derived from the endpoints and the source handle. Handles name the
//! logical output a branch leaves from:
//! - `condition-<conditionId>` for condition branches
//! - `router-<targetId>` for router destinations
//! - `error` for error paths
//! - `loop_exit` / `loop_continue` for loop sentinels

use dagwire_core::NodeId;
use serde::{Deserialize, Serialize};

/// Prefix of condition branch handles.
pub const CONDITION_HANDLE_PREFIX: &str = "condition-";

/// Prefix of router destination handles.
pub const ROUTER_HANDLE_PREFIX: &str = "router-";

/// Handle of error paths. Never relabeled.
pub const ERROR_HANDLE: &str = "error";

/// Handle of edges leaving a loop once it is done.
pub const LOOP_EXIT_HANDLE: &str = "loop_exit";

/// Handle of the end-to-start sentinel edge that starts another iteration.
pub const LOOP_CONTINUE_HANDLE: &str = "loop_continue";

/// Builds the handle of a condition branch.
#[must_use]
pub fn condition_handle(condition_id: &str) -> String {
    format!("{CONDITION_HANDLE_PREFIX}{condition_id}")
}

/// Builds the handle of a router destination.
#[must_use]
pub fn router_handle(target_id: &str) -> String {
    format!("{ROUTER_HANDLE_PREFIX}{target_id}")
}

/// Builds the ID of an edge.
///
/// The ID is `source→target`, suffixed with `-handle` when a non-empty
/// source handle is present, so branches of one block that share a target
/// still get distinct IDs.
#[must_use]
pub fn edge_id(source: &str, target: &str, source_handle: Option<&str>) -> String {
    match source_handle {
        Some(handle) if !handle.is_empty() => format!("{source}→{target}-{handle}"),
        _ => format!("{source}→{target}"),
    }
}

/// An edge in the execution graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagEdge {
    /// The target node.
    pub target: NodeId,
    /// The source output this edge leaves from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// The target input this edge arrives at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Initial activation; `Some(false)` only on loop-back edges, which the
    /// executor toggles per iteration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl DagEdge {
    /// Creates an edge to the given target without handles.
    #[must_use]
    pub fn new(target: impl Into<NodeId>) -> Self {
        Self {
            target: target.into(),
            source_handle: None,
            target_handle: None,
            is_active: None,
        }
    }

    /// Returns whether this is an inactive loop-back edge.
    #[must_use]
    pub fn is_loop_back(&self) -> bool {
        self.is_active == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_without_handle() {
        assert_eq!(edge_id("a", "b", None), "a→b");
    }

    #[test]
    fn edge_id_with_handle() {
        assert_eq!(
            edge_id("cond", "b", Some("condition-if")),
            "cond→b-condition-if"
        );
    }

    #[test]
    fn empty_handle_is_not_a_suffix() {
        assert_eq!(edge_id("a", "b", Some("")), "a→b");
    }

    #[test]
    fn handle_builders() {
        assert_eq!(condition_handle("else-id"), "condition-else-id");
        assert_eq!(router_handle("t1"), "router-t1");
    }

    #[test]
    fn serialized_edge_omits_empty_fields() {
        let edge = DagEdge::new("b");
        let json = serde_json::to_value(&edge).expect("serialize");
        assert_eq!(json, serde_json::json!({ "target": "b" }));
    }
}
