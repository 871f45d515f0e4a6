use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

use super::transaction::TransactionKind;

/// Log output format.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Settings that apply to every client session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct General {
    /// Maximum number of connections one statement may hold per data source.
    /// When a statement has more routed units than this, units share
    /// connections and results are buffered instead of streamed.
    ///
    /// _Default:_ `1`
    #[serde(default = "General::max_connections_size_per_query")]
    pub max_connections_size_per_query: usize,

    /// Always execute through prepared statements, even without parameters.
    ///
    /// _Default:_ `false`
    #[serde(default = "General::prefer_prepared_statement")]
    pub prefer_prepared_statement: bool,

    /// Transaction kind started when a client turns auto-commit off.
    ///
    /// _Default:_ `local`
    #[serde(default = "General::default_transaction_kind")]
    pub default_transaction_kind: TransactionKind,

    /// Log format.
    ///
    /// _Default:_ `text`
    #[serde(default = "General::log_format")]
    pub log_format: LogFormat,

    /// Close cached backend connections concurrently at teardown.
    ///
    /// _Default:_ `true`
    #[serde(default = "General::close_in_parallel")]
    pub close_in_parallel: bool,
}

impl Default for General {
    fn default() -> Self {
        Self {
            max_connections_size_per_query: Self::max_connections_size_per_query(),
            prefer_prepared_statement: Self::prefer_prepared_statement(),
            default_transaction_kind: Self::default_transaction_kind(),
            log_format: Self::log_format(),
            close_in_parallel: Self::close_in_parallel(),
        }
    }
}

impl General {
    fn env_or_default<T: FromStr>(env_var: &str, default: T) -> T {
        env::var(env_var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn env_bool_or_default(env_var: &str, default: bool) -> bool {
        env::var(env_var)
            .ok()
            .and_then(|v| match v.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn max_connections_size_per_query() -> usize {
        Self::env_or_default("SHARDLINE_MAX_CONNECTIONS_SIZE_PER_QUERY", 1)
    }

    fn prefer_prepared_statement() -> bool {
        Self::env_bool_or_default("SHARDLINE_PREFER_PREPARED_STATEMENT", false)
    }

    fn default_transaction_kind() -> TransactionKind {
        Self::env_or_default("SHARDLINE_DEFAULT_TRANSACTION_KIND", TransactionKind::Local)
    }

    fn log_format() -> LogFormat {
        Self::env_or_default("SHARDLINE_LOG_FORMAT", LogFormat::Text)
    }

    fn close_in_parallel() -> bool {
        Self::env_bool_or_default("SHARDLINE_CLOSE_IN_PARALLEL", true)
    }
}
