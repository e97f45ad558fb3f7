//! Error types for CLI operations.

use std::fmt;
use std::path::PathBuf;

/// Errors reported by the `dagwire` command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// An input file could not be read.
    ReadInput { path: PathBuf, details: String },
    /// A workflow document is not valid.
    InvalidWorkflow { path: PathBuf, details: String },
    /// A pause mapping document is not a JSON object of strings.
    InvalidPauseMapping { path: PathBuf, details: String },
    /// The execution graph could not be built.
    Construction { details: String },
    /// Output could not be rendered.
    Output { details: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::ReadInput { path, details } => {
                write!(f, "failed to read {}: {details}", path.display())
            }
            Self::InvalidWorkflow { path, details } => {
                write!(f, "invalid workflow {}: {details}", path.display())
            }
            Self::InvalidPauseMapping { path, details } => {
                write!(f, "invalid pause mapping {}: {details}", path.display())
            }
            Self::Construction { details } => {
                write!(f, "failed to build execution graph: {details}")
            }
            Self::Output { details } => write!(f, "failed to render output: {details}"),
        }
    }
}

impl std::error::Error for CliError {}
