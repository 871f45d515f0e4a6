//! Shardline keeps the backend connections of one client session:
//! it hands out physical connections per data source, replays session
//! state onto them and tears them down when statements,
//! transactions or the session end.

pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod frontend;

pub use context::ProxyContext;

use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::LogFormat;

/// Setup the logger, so `info!`, `debug!`
/// and other macros actually output something.
///
/// Using try_init and ignoring errors to allow
/// for use in tests (setting up multiple times).
pub fn logger() {
    logger_with(LogFormat::Text);
}

/// Setup the logger with the given output format.
pub fn logger_with(format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_file(false),
            )
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_file(false))
            .with(filter)
            .try_init(),
    };
}
