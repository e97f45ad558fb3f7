//! Core domain types and utilities for dagwire.
//!
//! This crate provides the identifier types and error-handling foundation
//! shared by the graph construction library and the command-line tool.

pub mod error;
pub mod id;

pub use error::{ParseIdError, Result};
pub use id::{BlockId, NodeId};
