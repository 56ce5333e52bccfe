//! Configuration management command
//!
//! Provides CLI interface to view and edit the settings file.

use anyhow::{Context, Result};
use cheevo_cli::config::{self, Settings, KEYS};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let settings = config::load()?;
    let config_path = config::config_file_path()?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    let mut section = "";
    for &key in KEYS {
        let (table, name) = key.split_once('.').unwrap_or(("", key));
        if table != section {
            println!("\n{}", format!("[{table}]").yellow());
            section = table;
        }

        let value = display_value(&settings, key)?;
        println!("  {} = {}", name.cyan(), value);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  watch.debounce_ms: 10-10000");
    println!("  notify.max_notify_achievements: 1-100");
    println!("  notify.refresh_cooldown_secs: 0-3600");
    println!("  cache.*_max_age_days: 1-3650");

    Ok(())
}

fn display_value(settings: &Settings, key: &str) -> Result<String> {
    Ok(match key {
        "api_key" if settings.api_key.is_empty() => "(not set)".dimmed().to_string(),
        "api_key" => mask(&settings.api_key),
        "folders" if settings.folders.is_empty() => "[]".to_string(),
        "folders" => settings
            .folders
            .iter()
            .map(|f| format!("\n    {}", f.display()))
            .collect(),
        "cache.dir" => match settings.cache_dir() {
            Ok(dir) if settings.cache.dir.is_none() => {
                format!("(default: {})", dir.display()).dimmed().to_string()
            }
            _ => settings.get(key)?,
        },
        _ => settings.get(key)?,
    })
}

/// Keep the last four characters of a secret
fn mask(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{visible}")
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let settings = config::load()?;
    println!("{}", settings.get(key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut settings = config::load()?;
    settings.set(key, value)?;
    config::save(&settings)?;

    let shown = if key == "api_key" { mask(value.trim()) } else { value.to_string() };
    println!("{} {} = {}", "✓".green(), key.cyan(), shown);
    restart_note();
    Ok(())
}

pub async fn run_add_folder(folder: &Path) -> Result<()> {
    let mut settings = config::load()?;
    let folder = absolute(folder)?;

    if !settings.add_folder(folder.clone()) {
        println!("{} is already configured", folder.display());
        return Ok(());
    }
    config::save(&settings)?;

    println!("{} Added {}", "✓".green(), folder.display());
    if !folder.is_dir() {
        println!("{}", "Warning: folder does not exist yet".yellow());
    }
    restart_note();
    Ok(())
}

pub async fn run_remove_folder(folder: &Path) -> Result<()> {
    let mut settings = config::load()?;

    // Accept both the stored spelling and its absolute form
    let removed = settings.remove_folder(folder) || settings.remove_folder(&absolute(folder)?);
    if !removed {
        anyhow::bail!("{} is not a configured folder", folder.display());
    }
    config::save(&settings)?;

    println!("{} Removed {}", "✓".green(), folder.display());
    restart_note();
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = config::config_file_path()?;

    if create && !config_path.exists() {
        config::load()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(path))
}

fn restart_note() {
    println!(
        "{}",
        "Note: Restart daemon for changes to take effect (cheevo stop && cheevo start)".yellow()
    );
}
