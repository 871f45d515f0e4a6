use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::read_to_string;
use std::path::Path;
use tracing::{info, warn};

use super::data_source::DataSource;
use super::error::Error;
use super::general::General;

/// Configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// General configuration.
    #[serde(default)]
    pub general: General,

    /// Physical data sources.
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
}

impl Config {
    /// Load configuration from disk or use defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let config = if let Ok(source) = read_to_string(path) {
            let config: Config = match toml::from_str(&source) {
                Ok(config) => config,
                Err(err) => return Err(Error::config(&source, err)),
            };
            info!("loaded \"{}\"", path.display());
            config
        } else {
            warn!(
                "\"{}\" doesn't exist, loading defaults instead",
                path.display()
            );
            Config::default()
        };

        config.check()?;

        Ok(config)
    }

    /// Validate settings that serde can't.
    pub fn check(&self) -> Result<(), Error> {
        if self.general.max_connections_size_per_query == 0 {
            return Err(Error::ZeroSetting("max_connections_size_per_query"));
        }

        let mut names = HashSet::new();
        for (position, data_source) in self.data_sources.iter().enumerate() {
            if data_source.name.is_empty() {
                return Err(Error::UnnamedDataSource(position));
            }
            if !names.insert(data_source.name.as_str()) {
                return Err(Error::DuplicateDataSource(data_source.name.clone()));
            }
        }

        Ok(())
    }

    /// Find a data source by name.
    pub fn data_source(&self, name: &str) -> Option<&DataSource> {
        self.data_sources.iter().find(|ds| ds.name == name)
    }
}
