//! Finranks CLI - sign in and call the Finranks API from a terminal

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "finranks")]
#[command(about = "Command-line client for the Finranks API")]
#[command(version)]
struct Cli {
    /// Set logging level (defaults to the configured level)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Data directory for session state, config and logs
    #[arg(short = 'd', long, global = true, env = "FINRANKS_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <data-dir>/config.json when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let data_dir = commands::resolve_data_dir(cli.data_dir);
    let client_config = config::load(cli.config.as_deref(), &data_dir)?;

    let level = cli.log_level.map_or_else(
        || client_config.log_level.clone(),
        |level| Level::from(level).as_str().to_string(),
    );
    let log_file = (!cli.no_file_log).then(|| data_dir.join("cli.log"));
    logging::init_logging(&level, log_file, cli.json_logs)?;

    info!(data_dir = %data_dir.display(), "Starting Finranks CLI");

    let run = cli.command.execute(data_dir, client_config);

    if cli.timeout == 0 {
        // No timeout - run until the command finishes
        match run.await {
            Ok(()) => {
                info!("Command completed successfully");
            }
            Err(e) => {
                error!("Command failed: {e:#}");
                std::process::exit(1);
            }
        }
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, run).await {
            Ok(Ok(())) => {
                info!("Command completed successfully");
            }
            Ok(Err(e)) => {
                error!("Command failed: {e:#}");
                std::process::exit(1);
            }
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
