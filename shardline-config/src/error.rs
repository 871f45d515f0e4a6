//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Toml(#[from] toml::de::Error),

    #[error("data source \"{0}\" is defined more than once")]
    DuplicateDataSource(String),

    #[error("data source at position {0} has no name")]
    UnnamedDataSource(usize),

    #[error("\"{0}\" must be at least 1")]
    ZeroSetting(&'static str),
}

impl Error {
    /// Log the line a TOML parse error points to.
    pub fn config(source: &str, err: toml::de::Error) -> Self {
        if let Some(span) = err.span() {
            let line = source[..span.start].lines().count().max(1);
            tracing::error!("config error on line {}: {}", line, err.message());
        }
        Self::Toml(err)
    }
}
