//! Execution graph construction.
//!
//! Building a DAG from a serialized workflow runs in three phases:
//! 1. [`ReachabilityAnalyzer`] finds the blocks reachable from a trigger
//! 2. [`NodeAllocator`] creates plain nodes, branch replicas and sentinels
//! 3. [`EdgeConstructor`] wires every edge between the allocated nodes
//!
//! [`DagBuilder`] runs all three and optionally checks the result for
//! forward cycles.

mod builder;
mod edges;
mod metadata;
mod nodes;
mod reachability;

#[cfg(test)]
pub(crate) mod fixtures;

pub use builder::DagBuilder;
pub use edges::EdgeConstructor;
pub use metadata::{ConditionConfig, EdgeMetadata, parse_condition_config};
pub use nodes::NodeAllocator;
pub use reachability::ReachabilityAnalyzer;

use serde::{Deserialize, Serialize};

/// Knobs that change how strictly a graph is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionOptions {
    /// Fail on direct edges between members of two different parallels
    /// instead of dropping them with a warning.
    #[serde(default)]
    pub strict_parallel_edges: bool,

    /// Reject graphs with cycles outside loop-back edges.
    #[serde(default = "default_verify_acyclic")]
    pub verify_acyclic: bool,
}

fn default_verify_acyclic() -> bool {
    true
}

impl Default for ConstructionOptions {
    fn default() -> Self {
        Self {
            strict_parallel_edges: false,
            verify_acyclic: default_verify_acyclic(),
        }
    }
}

impl ConstructionOptions {
    /// Sets whether cross-parallel edges are an error.
    #[must_use]
    pub fn with_strict_parallel_edges(mut self, strict: bool) -> Self {
        self.strict_parallel_edges = strict;
        self
    }

    /// Sets whether the finished graph is checked for cycles.
    #[must_use]
    pub fn with_verify_acyclic(mut self, verify: bool) -> Self {
        self.verify_acyclic = verify;
        self
    }
}
