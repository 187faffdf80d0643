//! Command-line interface parsing for the lichess client
//!
//! Options are declared once with clap and turned into typed configuration
//! (`EngineConfig` plus a `Command`) before any request is made.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::ratings::{DEFAULT_PER_PAGE, DEFAULT_VARIANTS};
use crate::extract::RatingsExport;
use crate::query::config::{parse_interval_secs, ConfigError, EngineConfig};

/// Lichess client - export team ratings and watch players
#[derive(Parser, Debug)]
#[command(name = "lichess-client")]
#[command(about = "Rate-limited, cached lichess API queries")]
#[command(version)]
pub struct Cli {
    /// Seconds to wait between two API requests (minimum 1)
    #[arg(long, global = true, default_value_t = 2.0, value_name = "SECONDS")]
    pub delay: f64,

    /// Also append log output to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Export the ratings of every member of a team to CSV
    Ratings {
        /// Team identifier
        #[arg(long, short = 't')]
        team: String,

        /// Members requested per page
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,

        /// Comma-separated perf types, one CSV column each
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_VARIANTS.map(String::from))]
        variants: Vec<String>,

        /// CSV destination
        #[arg(long, short = 'o', default_value = "out.csv")]
        output: PathBuf,
    },

    /// Wait until a user is online, then ring the terminal bell
    Watch {
        /// Username to watch
        #[arg(long, short = 'u')]
        user: String,

        /// Seconds between two status checks
        #[arg(long, default_value_t = 300.0, value_name = "SECONDS")]
        interval: f64,
    },
}

/// What the run should do, after validation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ratings {
        export: RatingsExport,
        output: PathBuf,
    },
    Watch {
        user: String,
        interval: Duration,
    },
}

/// Validated startup configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StartupConfig {
    pub engine: EngineConfig,
    pub command: Command,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(ConfigError)` if the delay or interval is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let engine = EngineConfig::default().with_request_delay_secs(cli.delay)?;
        let command = match &cli.command {
            CliCommand::Ratings {
                team,
                per_page,
                variants,
                output,
            } => Command::Ratings {
                export: RatingsExport {
                    team: team.clone(),
                    per_page: *per_page,
                    variants: variants.clone(),
                },
                output: output.clone(),
            },
            CliCommand::Watch { user, interval } => Command::Watch {
                user: user.clone(),
                interval: parse_interval_secs(*interval)?,
            },
        };
        Ok(Self { engine, command })
    }
}
