//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use std::path::PathBuf;

/// Environment variable that overrides the state directory
pub const STATE_ENV: &str = "CHEEVO_STATE_DIR";

/// Directory for the daemon lock and logs
///
/// `CHEEVO_STATE_DIR`, else the platform state directory, else the local
/// data directory.
pub fn state_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(STATE_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("cheevo"))
        .context("Could not determine state directory")
}

pub fn log_dir() -> Result<PathBuf> {
    Ok(state_dir()?.join("logs"))
}

/// Format a timestamp relative to now ("2 hours ago")
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    format_relative_to(ts, Utc::now())
}

fn format_relative_to(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = match (now - ts).num_seconds() {
        s if s < 0 => return "in the future".to_string(),
        s => s,
    };

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format a timestamp in local time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
