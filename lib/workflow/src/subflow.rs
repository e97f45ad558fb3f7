//! Naming and sizing of loop and parallel constructs.
//!
//! Constructs do not appear as nodes themselves. A loop is bracketed by two
//! sentinel nodes, and every member of a parallel is replicated once per
//! branch. The IDs of those synthetic nodes are derived from the construct
//! and block IDs:
//! - `loop-<loopId>-sentinel-start` / `loop-<loopId>-sentinel-end`
//! - `<blockId>₍<branchIndex>₎`

use crate::definition::{ParallelType, SerializedParallel};
use dagwire_core::NodeId;
use serde_json::Value as JsonValue;

/// Branch count of a `count` parallel that declares none.
pub const DEFAULT_PARALLEL_COUNT: usize = 1;

const BRANCH_OPEN: char = '₍';
const BRANCH_CLOSE: char = '₎';

/// Builds the ID of a loop's start sentinel.
#[must_use]
pub fn sentinel_start_id(loop_id: &str) -> NodeId {
    NodeId::new(format!("loop-{loop_id}-sentinel-start"))
}

/// Builds the ID of a loop's end sentinel.
#[must_use]
pub fn sentinel_end_id(loop_id: &str) -> NodeId {
    NodeId::new(format!("loop-{loop_id}-sentinel-end"))
}

/// Builds the ID of one branch replica of a parallel member.
#[must_use]
pub fn branch_node_id(block_id: &str, branch_index: usize) -> NodeId {
    NodeId::new(format!("{block_id}{BRANCH_OPEN}{branch_index}{BRANCH_CLOSE}"))
}

/// Recovers the block ID of a branch replica.
///
/// IDs without a trailing `₍<digits>₎` are returned unchanged.
#[must_use]
pub fn base_block_id(node_id: &str) -> &str {
    let Some(inner) = node_id.strip_suffix(BRANCH_CLOSE) else {
        return node_id;
    };
    let Some(open) = inner.rfind(BRANCH_OPEN) else {
        return node_id;
    };
    let digits = &inner[open + BRANCH_OPEN.len_utf8()..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return node_id;
    }
    &inner[..open]
}

/// Returns the items a parallel distributes across its branches.
///
/// The distribution may be a JSON array, an object (one item per entry), or
/// a string holding either. Anything else, including references that are
/// only resolved at run time, yields no items.
#[must_use]
pub fn distribution_items(config: &SerializedParallel) -> Vec<JsonValue> {
    match &config.distribution {
        Some(value) => items_of(value, true),
        None => Vec::new(),
    }
}

fn items_of(value: &JsonValue, parse_strings: bool) -> Vec<JsonValue> {
    match value {
        JsonValue::Array(items) => items.clone(),
        JsonValue::Object(entries) => entries
            .iter()
            .map(|(key, value)| {
                JsonValue::Array(vec![JsonValue::String(key.clone()), value.clone()])
            })
            .collect(),
        JsonValue::String(raw) if parse_strings => {
            let trimmed = raw.trim();
            if trimmed.starts_with('<') {
                return Vec::new();
            }
            match serde_json::from_str::<JsonValue>(trimmed) {
                Ok(parsed) => items_of(&parsed, false),
                Err(_) => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Returns the number of branches a parallel expands into.
///
/// `collection` parallels get one branch per distribution item, `count`
/// parallels their declared count. An untyped parallel is a collection when
/// it carries a distribution.
#[must_use]
pub fn branch_count(config: &SerializedParallel) -> usize {
    let parallel_type = config.parallel_type.unwrap_or(if config.distribution.is_some() {
        ParallelType::Collection
    } else {
        ParallelType::Count
    });

    match parallel_type {
        ParallelType::Collection => distribution_items(config).len(),
        ParallelType::Count => config
            .count
            .map_or(DEFAULT_PARALLEL_COUNT, |count| count as usize),
    }
}
