use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::backend::SessionReset;
use crate::config::{Config, Error as ConfigError};

/// Shardline manages the backend connections of sharded database sessions.
#[derive(Parser, Debug)]
#[command(name = "", version = concat!("Shardline v", env!("CARGO_PKG_VERSION")))]
pub struct Cli {
    /// Path to the configuration file. Default: "shardline.toml"
    #[arg(short, long, default_value = "shardline.toml")]
    pub config: PathBuf,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Check the configuration file for errors.
    Configcheck,

    /// List configured data sources and how their sessions are reset.
    DataSources,
}

#[derive(Debug, Error)]
pub enum ConfigCheckError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid {0}: {1}")]
    Invalid(PathBuf, #[source] ConfigError),
}

/// Confirm that the configuration file exists and is valid.
///
/// Unlike [`Config::load`], a missing file is an error.
pub fn config_check(path: &Path) -> Result<Config, ConfigCheckError> {
    let source = read_to_string(path).map_err(|err| ConfigCheckError::Io(path.into(), err))?;
    let config: Config =
        toml::from_str(&source).map_err(|err| ConfigCheckError::Parse(path.into(), err))?;
    config
        .check()
        .map_err(|err| ConfigCheckError::Invalid(path.into(), err))?;

    Ok(config)
}

/// One line per data source.
pub fn data_sources(config: &Config) -> Vec<String> {
    config
        .data_sources
        .iter()
        .map(|ds| {
            format!(
                "{} (database: {}, dialect: {}, reset: {})",
                ds.name,
                ds.database,
                ds.dialect,
                ds.dialect.reset_all_statement().unwrap_or("none"),
            )
        })
        .collect()
}
