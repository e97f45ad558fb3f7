//! Strongly-typed identifiers for workflow blocks and graph nodes.
//!
//! Workflows are authored with string identifiers, and the graph builder
//! derives further identifiers from them (loop sentinels, parallel branch
//! replicas). Both kinds are thin wrappers around `String` so they can be
//! used as JSON map keys and looked up by `&str`.

use crate::error::ParseIdError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Macro to generate a strongly-typed string identifier.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the ID, returning the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "identifier is empty".to_string(),
                    });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id!(
    /// Identifier of a block (or loop/parallel construct) in an authored workflow.
    BlockId
);

define_id!(
    /// Identifier of a node in a built execution graph.
    ///
    /// Plain blocks keep their block ID; sentinels and branch replicas
    /// get derived IDs.
    NodeId
);

impl From<&BlockId> for NodeId {
    fn from(id: &BlockId) -> Self {
        Self(id.0.clone())
    }
}

impl From<BlockId> for NodeId {
    fn from(id: BlockId) -> Self {
        Self(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn display_is_the_raw_string() {
        let id = BlockId::new("agent-1");
        assert_eq!(id.to_string(), "agent-1");
    }

    #[test]
    fn parse_rejects_blank() {
        let result: Result<NodeId, _> = "  ".parse();
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "NodeId");
    }

    #[test]
    fn lookup_by_str() {
        let mut set = HashSet::new();
        set.insert(NodeId::new("a"));
        assert!(set.contains("a"));
        assert!(!set.contains("b"));
    }

    #[test]
    fn block_id_converts_to_node_id() {
        let block = BlockId::new("fn-1");
        let node = NodeId::from(&block);
        assert_eq!(node.as_str(), block.as_str());
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = NodeId::new("loop-l1-sentinel-start");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"loop-l1-sentinel-start\"");
        let parsed: NodeId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }
}
