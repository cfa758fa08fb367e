use anyhow::Result;
use finranks_core::logging::{InstrumentationConfig, env_filter, init_tracing};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the CLI
///
/// Without a log file everything goes to stderr; with one, the file gets a
/// plain copy of what stderr shows.
pub fn init_logging(level: &str, log_file: Option<PathBuf>, json: bool) -> Result<()> {
    let directives = crate_directives(level);

    let Some(log_file_path) = log_file else {
        return init_tracing(&InstrumentationConfig {
            service_name: "finranks-cli".to_string(),
            log_level: directives,
            json,
        });
    };

    if let Some(parent) = log_file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_file_path)?;

    tracing_subscriber::registry()
        .with(env_filter(&directives))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Scope the level to our own crates so dependency noise stays out
fn crate_directives(level: &str) -> String {
    let level = level.to_lowercase();
    format!("finranks={level},finranks_core={level},finranks_http={level}")
}
