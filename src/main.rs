//! Lichess Client - export team ratings and watch players
//!
//! Every request goes through a single query engine that caches responses on disk
//! and keeps to the API's rate limit.

use std::fs::File;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use lichess_client::cli::{Cli, Command, StartupConfig};
use lichess_client::extract::{export_team_ratings, watch_online, ExtractError};
use lichess_client::logging;
use lichess_client::query::QueryEngine;

/// Exit status for invalid options
const EXIT_CONFIG: u8 = 2;

async fn run(engine: &mut QueryEngine, command: Command) -> Result<(), ExtractError> {
    match command {
        Command::Ratings { export, output } => {
            let mut writer = csv::Writer::from_writer(File::create(&output)?);
            export_team_ratings(engine, &export, &mut writer).await?;
        }
        Command::Watch { user, interval } => {
            watch_online(engine, &user, interval).await?;
            println!("User {} is online\x07", user);
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_file.as_deref()) {
        eprintln!("Failed to open log file: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }

    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid options: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let mut engine = match QueryEngine::new(config.engine) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&mut engine, config.command).await;
    engine.report_stats();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
