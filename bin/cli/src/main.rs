use clap::Parser;
use dagwire_cli::cli::{Cli, Command, InputArgs};
use dagwire_cli::commands::{build_dag, render_edges, render_json};
use dagwire_cli::config::CliConfig;
use dagwire_cli::error::CliError;
use dagwire_workflow::{ConstructionOptions, Dag};
use rootcause::Report;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CliConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{}",
                CliError::Config {
                    details: e.to_string()
                }
            );
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli.command, config.construction) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, options: ConstructionOptions) -> Result<String, Report<CliError>> {
    match command {
        Command::Build { input, compact } => {
            let dag = build(&input, options)?;
            let mut json = render_json(&dag, compact)?;
            json.push('\n');
            Ok(json)
        }
        Command::Edges { input } => Ok(render_edges(&build(&input, options)?)),
    }
}

fn build(input: &InputArgs, options: ConstructionOptions) -> Result<Dag, Report<CliError>> {
    let options = if input.strict_parallel_edges {
        options.with_strict_parallel_edges(true)
    } else {
        options
    };
    build_dag(&input.workflow, input.pause_mapping.as_deref(), options)
}
