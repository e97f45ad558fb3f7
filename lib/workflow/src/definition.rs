//! Serialized workflow definitions.
//!
//! A serialized workflow is the authored, editor-facing form of an
//! automation:
//! - Blocks (a type tag plus free-form parameters)
//! - Ordered connections between blocks, with optional handles
//! - Loop and parallel constructs grouping member blocks
//!
//! The JSON shape uses camelCase keys and tolerates unknown fields, so
//! documents exported by the editor load unchanged.

use dagwire_core::BlockId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

/// Block type tag for condition blocks.
pub const CONDITION_BLOCK_TYPE: &str = "condition";

/// Block type tag for router blocks.
pub const ROUTER_BLOCK_TYPE: &str = "router";

/// Block metadata category used by trigger blocks.
pub const TRIGGER_CATEGORY: &str = "triggers";

/// Block type tags that start a workflow run.
pub const TRIGGER_BLOCK_TYPES: &[&str] = &[
    "starter",
    "start_trigger",
    "api_trigger",
    "chat_trigger",
    "input_trigger",
    "manual_trigger",
    "schedule",
    "webhook",
    "generic_webhook",
];

/// Returns whether a block type tag denotes a condition block.
#[must_use]
pub fn is_condition_block_type(block_type: &str) -> bool {
    block_type == CONDITION_BLOCK_TYPE
}

/// Returns whether a block type tag denotes a router block.
#[must_use]
pub fn is_router_block_type(block_type: &str) -> bool {
    block_type == ROUTER_BLOCK_TYPE
}

/// Returns whether a block type tag denotes a trigger block.
#[must_use]
pub fn is_trigger_block_type(block_type: &str) -> bool {
    TRIGGER_BLOCK_TYPES.contains(&block_type)
}

/// Descriptive metadata of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    /// The block type tag (e.g. "condition", "router", "agent").
    #[serde(default)]
    pub id: String,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Palette category (e.g. "triggers", "blocks", "tools").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Configuration of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfig {
    /// The tool backing this block, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Block parameters as authored in the editor.
    #[serde(default)]
    pub params: Map<String, JsonValue>,
}

fn default_enabled() -> bool {
    true
}

/// A single workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBlock {
    /// Block identifier, unique within the workflow.
    pub id: BlockId,
    /// Type tag and descriptive metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BlockMetadata>,
    /// Tool and parameters.
    #[serde(default)]
    pub config: BlockConfig,
    /// Disabled blocks are ignored by the graph builder.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SerializedBlock {
    /// Creates an enabled block of the given type with no parameters.
    #[must_use]
    pub fn new(id: impl Into<BlockId>, block_type: impl Into<String>) -> Self {
        let block_type = block_type.into();
        Self {
            id: id.into(),
            metadata: Some(BlockMetadata {
                id: block_type.clone(),
                name: None,
                category: None,
            }),
            config: BlockConfig {
                tool: Some(block_type),
                params: Map::new(),
            },
            enabled: true,
        }
    }

    /// Sets a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.config.params.insert(key.into(), value);
        self
    }

    /// Sets the metadata category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(BlockMetadata::default)
            .category = Some(category.into());
        self
    }

    /// Marks the block as disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Returns the block type tag, or an empty string when untyped.
    #[must_use]
    pub fn block_type(&self) -> &str {
        self.metadata.as_ref().map_or("", |m| m.id.as_str())
    }

    /// Returns a parameter value by name.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&JsonValue> {
        self.config.params.get(key)
    }

    /// Returns whether this block starts a workflow run.
    #[must_use]
    pub fn is_trigger(&self) -> bool {
        is_trigger_block_type(self.block_type())
            || self
                .metadata
                .as_ref()
                .and_then(|m| m.category.as_deref())
                .is_some_and(|c| c == TRIGGER_CATEGORY)
    }
}

/// A directed connection between two blocks (or constructs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Source block or construct ID.
    pub source: BlockId,
    /// Target block or construct ID.
    pub target: BlockId,
    /// Output port on the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Input port on the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Connection {
    /// Creates a connection without handles.
    #[must_use]
    pub fn new(source: impl Into<BlockId>, target: impl Into<BlockId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Sets the source handle.
    #[must_use]
    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Sets the target handle.
    #[must_use]
    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }
}

/// How a loop decides how many times to iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopType {
    /// Fixed iteration count.
    #[default]
    For,
    /// One iteration per collection item.
    ForEach,
    /// Condition checked before each iteration.
    While,
    /// Condition checked after each iteration.
    DoWhile,
}

/// A loop construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedLoop {
    /// Construct identifier (referenced by connections like a block ID).
    pub id: BlockId,
    /// Member block IDs.
    #[serde(default)]
    pub nodes: Vec<BlockId>,
    /// Iteration count for `for` loops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// Loop flavor.
    #[serde(default)]
    pub loop_type: LoopType,
    /// Items for `forEach` loops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_each_items: Option<JsonValue>,
}

impl SerializedLoop {
    /// Creates a `for` loop over the given members.
    #[must_use]
    pub fn new<I, S>(id: impl Into<BlockId>, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BlockId>,
    {
        Self {
            id: id.into(),
            nodes: nodes.into_iter().map(Into::into).collect(),
            iterations: None,
            loop_type: LoopType::For,
            for_each_items: None,
        }
    }

    /// Sets the iteration count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }
}

/// How a parallel construct decides its branch count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParallelType {
    /// Fixed branch count.
    Count,
    /// One branch per distribution item.
    Collection,
}

/// A parallel construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedParallel {
    /// Construct identifier (referenced by connections like a block ID).
    pub id: BlockId,
    /// Member block IDs.
    #[serde(default)]
    pub nodes: Vec<BlockId>,
    /// Declared branch count for `count` parallels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Parallel flavor; inferred from `distribution` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_type: Option<ParallelType>,
    /// Items distributed across branches for `collection` parallels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<JsonValue>,
}

impl SerializedParallel {
    /// Creates a `count` parallel with a fixed branch count.
    #[must_use]
    pub fn with_count<I, S>(id: impl Into<BlockId>, nodes: I, count: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BlockId>,
    {
        Self {
            id: id.into(),
            nodes: nodes.into_iter().map(Into::into).collect(),
            count: Some(count),
            parallel_type: Some(ParallelType::Count),
            distribution: None,
        }
    }

    /// Creates a `collection` parallel distributing the given items.
    #[must_use]
    pub fn over_collection<I, S>(id: impl Into<BlockId>, nodes: I, distribution: JsonValue) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<BlockId>,
    {
        Self {
            id: id.into(),
            nodes: nodes.into_iter().map(Into::into).collect(),
            count: None,
            parallel_type: Some(ParallelType::Collection),
            distribution: Some(distribution),
        }
    }
}

/// An authored workflow, as handed to the graph builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedWorkflow {
    /// Serialization format version.
    #[serde(default)]
    pub version: String,
    /// All blocks.
    #[serde(default)]
    pub blocks: Vec<SerializedBlock>,
    /// Connections, in authored order.
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Loop constructs keyed by construct ID.
    #[serde(default)]
    pub loops: IndexMap<BlockId, SerializedLoop>,
    /// Parallel constructs keyed by construct ID.
    #[serde(default)]
    pub parallels: IndexMap<BlockId, SerializedParallel>,
}

impl SerializedWorkflow {
    /// Creates an empty workflow.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: "1".to_string(),
            ..Self::default()
        }
    }

    /// Parses a workflow from JSON.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the document is not a valid workflow.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Adds a block.
    #[must_use]
    pub fn with_block(mut self, block: SerializedBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Adds a connection.
    #[must_use]
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Adds a loop construct.
    #[must_use]
    pub fn with_loop(mut self, config: SerializedLoop) -> Self {
        self.loops.insert(config.id.clone(), config);
        self
    }

    /// Adds a parallel construct.
    #[must_use]
    pub fn with_parallel(mut self, config: SerializedParallel) -> Self {
        self.parallels.insert(config.id.clone(), config);
        self
    }

    /// Returns a block by ID.
    #[must_use]
    pub fn block(&self, id: &str) -> Option<&SerializedBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Returns whether the ID names a loop or parallel construct.
    #[must_use]
    pub fn is_construct(&self, id: &str) -> bool {
        self.loops.contains_key(id) || self.parallels.contains_key(id)
    }

    /// Returns every block that is a member of some loop.
    #[must_use]
    pub fn blocks_in_loops(&self) -> HashSet<BlockId> {
        self.loops
            .values()
            .flat_map(|l| l.nodes.iter().cloned())
            .collect()
    }

    /// Returns every block that is a member of some parallel.
    #[must_use]
    pub fn blocks_in_parallels(&self) -> HashSet<BlockId> {
        self.parallels
            .values()
            .flat_map(|p| p.nodes.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_editor_export() {
        let json = r#"{
            "version": "1",
            "blocks": [
                {
                    "id": "start",
                    "position": { "x": 0, "y": 0 },
                    "metadata": { "id": "starter", "name": "Start" },
                    "config": { "tool": "starter", "params": {} },
                    "inputs": {},
                    "outputs": {},
                    "enabled": true
                },
                {
                    "id": "check",
                    "metadata": { "id": "condition" },
                    "config": { "params": { "conditions": "[]" } }
                }
            ],
            "connections": [
                { "source": "start", "target": "check", "sourceHandle": "source" }
            ],
            "loops": {
                "l1": { "id": "l1", "nodes": ["check"], "iterations": 3, "loopType": "forEach" }
            },
            "parallels": {
                "p1": { "id": "p1", "nodes": [], "parallelType": "collection", "distribution": [1, 2] }
            }
        }"#;

        let workflow = SerializedWorkflow::from_json(json).expect("parse");
        assert_eq!(workflow.blocks.len(), 2);
        assert!(workflow.blocks[1].enabled);
        assert_eq!(workflow.blocks[1].block_type(), "condition");
        assert_eq!(
            workflow.connections[0].source_handle.as_deref(),
            Some("source")
        );
        assert_eq!(workflow.loops["l1"].loop_type, LoopType::ForEach);
        assert_eq!(
            workflow.parallels["p1"].parallel_type,
            Some(ParallelType::Collection)
        );
    }

    #[test]
    fn untyped_block_has_empty_type() {
        let block: SerializedBlock = serde_json::from_value(json!({ "id": "x" })).expect("parse");
        assert_eq!(block.block_type(), "");
        assert!(block.enabled);
    }

    #[test]
    fn trigger_detection_by_type_and_category() {
        assert!(SerializedBlock::new("s", "starter").is_trigger());
        assert!(
            SerializedBlock::new("g", "gmail_poller")
                .with_category(TRIGGER_CATEGORY)
                .is_trigger()
        );
        assert!(!SerializedBlock::new("a", "agent").is_trigger());
    }

    #[test]
    fn member_sets() {
        let workflow = SerializedWorkflow::new()
            .with_loop(SerializedLoop::new("l1", ["a", "b"]))
            .with_parallel(SerializedParallel::with_count("p1", ["c"], 2));

        let in_loops = workflow.blocks_in_loops();
        assert!(in_loops.contains("a"));
        assert!(in_loops.contains("b"));
        assert!(!in_loops.contains("c"));
        assert!(workflow.blocks_in_parallels().contains("c"));
        assert!(workflow.is_construct("l1"));
        assert!(workflow.is_construct("p1"));
        assert!(!workflow.is_construct("a"));
    }
}
