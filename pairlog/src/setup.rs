//! Startup shared by the pairlog binaries.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/pairlog/data.db (~/.local/share/pairlog/data.db)
//! - Logs: $XDG_STATE_HOME/pairlog/pairlog.log (~/.local/state/pairlog/pairlog.log)
//! - Config: $XDG_CONFIG_HOME/pairlog/config.toml (~/.config/pairlog/config.toml)

// Each binary uses a subset of these helpers.
#![allow(dead_code)]

use anyhow::{Context, Result};
use pairlog_core::logging::LoggingGuard;
use pairlog_core::{Config, Database};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Load configuration and start logging.
///
/// The returned guard must be held for the life of the process.
pub fn init(bin: &str) -> Result<(Config, LoggingGuard)> {
    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;
    let guard = pairlog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(bin, profile = config.profile.as_str(), "Starting");
    Ok((config, guard))
}

/// Open and migrate the correction database.
pub fn open_database() -> Result<Database> {
    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;
    Ok(db)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}
