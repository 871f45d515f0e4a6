//! Shardline command line.

use std::process::exit;

use clap::Parser;
use tracing::{error, info};

use shardline::cli::{config_check, data_sources, Cli, Commands};

fn main() {
    let args = Cli::parse();

    let config = match config_check(&args.config) {
        Ok(config) => config,
        Err(err) => {
            shardline::logger();
            error!("{}", err);
            exit(1);
        }
    };

    shardline::logger_with(config.general.log_format);

    match args.command.unwrap_or(Commands::Configcheck) {
        Commands::Configcheck => {
            info!(
                "\"{}\" is valid, {} data sources",
                args.config.display(),
                config.data_sources.len()
            );
        }

        Commands::DataSources => {
            for line in data_sources(&config) {
                println!("{}", line);
            }
        }
    }
}
