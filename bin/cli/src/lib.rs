//! Command line front end for dagwire.
//!
//! Reads a serialized workflow, builds its execution graph and prints it
//! either as JSON or as one line per edge.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
