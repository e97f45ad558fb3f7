//! Centralized CLI configuration.
//!
//! Loaded via the `config` crate from built-in defaults, an optional TOML
//! file, then environment variables. Environment variables are prefixed
//! with `DAGWIRE_` and use `__` to reach nested keys, e.g.
//! `DAGWIRE_CONSTRUCTION__STRICT_PARALLEL_EDGES=true`.

use dagwire_workflow::ConstructionOptions;
use serde::Deserialize;
use std::path::Path;

/// Prefix of environment variables read by the CLI.
pub const ENV_PREFIX: &str = "DAGWIRE";

/// CLI configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Graph construction options.
    #[serde(default)]
    pub construction: ConstructionOptions,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            construction: ConstructionOptions::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from an optional file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with_environment(path, environment())
    }

    fn load_with_environment(
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
