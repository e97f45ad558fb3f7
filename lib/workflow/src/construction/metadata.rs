//! Block metadata consulted while wiring edges.
//!
//! Condition and router blocks fan out over several connections, and the
//! handle of each connection depends on the block type. This module
//! collects the type tags, condition lists and router IDs up front and
//! resolves the effective source handle of every connection.

use crate::definition::{
    Connection, SerializedBlock, SerializedWorkflow, is_condition_block_type,
    is_router_block_type,
};
use crate::edge::{ERROR_HANDLE, condition_handle, router_handle};
use dagwire_core::BlockId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// One branch of a condition block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Branch identifier, used in the `condition-<id>` handle.
    pub id: String,
    /// Display label ("if", "else if", "else").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The condition expression; empty for `else`.
    #[serde(default)]
    pub condition: String,
}

/// Per-block facts needed to resolve handles.
#[derive(Debug, Clone, Default)]
pub struct EdgeMetadata {
    block_types: HashMap<BlockId, String>,
    conditions: HashMap<BlockId, Vec<ConditionConfig>>,
    routers: HashSet<BlockId>,
}

impl EdgeMetadata {
    /// Collects metadata from every block of a workflow.
    #[must_use]
    pub fn from_workflow(workflow: &SerializedWorkflow) -> Self {
        let mut metadata = Self::default();

        for block in &workflow.blocks {
            let block_type = block.block_type();
            metadata
                .block_types
                .insert(block.id.clone(), block_type.to_string());

            if is_condition_block_type(block_type) {
                if let Some(conditions) = parse_condition_config(block) {
                    metadata.conditions.insert(block.id.clone(), conditions);
                }
            } else if is_router_block_type(block_type) {
                metadata.routers.insert(block.id.clone());
            }
        }

        metadata
    }

    /// Returns the type tag recorded for a block.
    #[must_use]
    pub fn block_type(&self, block_id: &str) -> Option<&str> {
        self.block_types.get(block_id).map(String::as_str)
    }

    /// Returns the parsed conditions of a condition block.
    #[must_use]
    pub fn conditions(&self, block_id: &str) -> Option<&[ConditionConfig]> {
        self.conditions.get(block_id).map(Vec::as_slice)
    }

    /// Returns whether a block is a router.
    #[must_use]
    pub fn is_router(&self, block_id: &str) -> bool {
        self.routers.contains(block_id)
    }

    /// Resolves the source handle of one connection.
    ///
    /// `position` is the index of the connection among all connections
    /// leaving the same source, in workflow order. A condition source
    /// without an explicit handle takes the condition at that index. A
    /// router source always gets `router-<target>`, except on error paths.
    #[must_use]
    pub fn resolve_source_handle(
        &self,
        connection: &Connection,
        position: usize,
    ) -> Option<String> {
        let source = connection.source.as_str();
        let mut handle = connection
            .source_handle
            .clone()
            .filter(|h| !h.is_empty());

        if handle.is_none() && self.block_type(source).is_some_and(is_condition_block_type) {
            if let Some(condition) = self.conditions(source).and_then(|c| c.get(position)) {
                handle = Some(condition_handle(&condition.id));
            }
        }

        if self.is_router(source) && handle.as_deref() != Some(ERROR_HANDLE) {
            handle = Some(router_handle(connection.target.as_str()));
        }

        handle
    }

    /// Resolves the source handle of every connection, in workflow order.
    #[must_use]
    pub fn resolve_source_handles(&self, workflow: &SerializedWorkflow) -> Vec<Option<String>> {
        let mut positions: HashMap<&str, usize> = HashMap::new();

        workflow
            .connections
            .iter()
            .map(|connection| {
                let position = positions.entry(connection.source.as_str()).or_default();
                let handle = self.resolve_source_handle(connection, *position);
                *position += 1;
                handle
            })
            .collect()
    }
}

/// Parses the `conditions` parameter of a condition block.
///
/// Accepts a JSON-encoded string or an already structured array. Returns
/// `None` when the parameter is missing or malformed; malformed input is
/// logged and the block is wired without condition handles.
#[must_use]
pub fn parse_condition_config(block: &SerializedBlock) -> Option<Vec<ConditionConfig>> {
    let parsed = match block.param("conditions")? {
        JsonValue::String(raw) => serde_json::from_str(raw),
        value @ JsonValue::Array(_) => serde_json::from_value(value.clone()),
        _ => return None,
    };

    match parsed {
        Ok(conditions) => Some(conditions),
        Err(e) => {
            warn!(block_id = %block.id, error = %e, "failed to parse condition config");
            None
        }
    }
}
