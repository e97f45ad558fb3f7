//! Command line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dagwire", author, version, about = "Build execution graphs from workflows")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the execution graph and print it as JSON
    Build {
        #[command(flatten)]
        input: InputArgs,

        /// Print JSON on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Build the execution graph and print one line per edge
    Edges {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Serialized workflow JSON file
    pub workflow: PathBuf,

    /// JSON object mapping paused blocks to their response triggers
    #[arg(long)]
    pub pause_mapping: Option<PathBuf>,

    /// Fail on edges between members of different parallels
    #[arg(long)]
    pub strict_parallel_edges: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_arguments() {
        let cli = Cli::try_parse_from([
            "dagwire",
            "build",
            "flow.json",
            "--pause-mapping",
            "pause.json",
            "--compact",
            "--config",
            "dagwire.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("dagwire.toml")));
        let Command::Build { input, compact } = cli.command else {
            panic!("expected build command");
        };
        assert!(compact);
        assert_eq!(input.workflow, PathBuf::from("flow.json"));
        assert_eq!(input.pause_mapping, Some(PathBuf::from("pause.json")));
        assert!(!input.strict_parallel_edges);
    }

    #[test]
    fn parses_edges_arguments() {
        let cli = Cli::try_parse_from(["dagwire", "edges", "flow.json", "--strict-parallel-edges"])
            .unwrap();

        let Command::Edges { input } = cli.command else {
            panic!("expected edges command");
        };
        assert!(input.strict_parallel_edges);
        assert!(cli.config.is_none());
    }

    #[test]
    fn workflow_path_is_required() {
        assert!(Cli::try_parse_from(["dagwire", "build"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
