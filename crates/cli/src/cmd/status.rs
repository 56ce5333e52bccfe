//! Show daemon and folder status

use anyhow::Result;
use cheevo_cli::{config, daemon, util};
use owo_colors::OwoColorize;

pub async fn run() -> Result<()> {
    let state_dir = util::state_dir()?;
    let settings = config::load()?;

    println!("{}", "cheevo Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    print!("Daemon:        ");
    match daemon::status(&state_dir) {
        Some(info) => {
            println!("{}", "Running ✓".green());
            println!("  PID:         {}", info.pid);
            println!(
                "  Started:     {} ({})",
                util::format_relative_time(info.started_at),
                util::format_absolute_time(info.started_at).dimmed()
            );
        }
        None => {
            println!("{}", "Not running".yellow());
            println!("  {}", "Tip: Start with 'cheevo start'".dimmed());
        }
    }
    println!();

    print!("API key:       ");
    if settings.credentials().is_some() {
        println!("{}", "configured".green());
    } else {
        println!("{}", "not set".yellow());
        println!(
            "  {}",
            "Tip: cheevo config set api_key <key> to show names and icons".dimmed()
        );
    }

    if let Ok(cache_dir) = settings.cache_dir() {
        println!("Cache:         {}", cache_dir.display().to_string().cyan());
    }
    println!("Logs:          {}", util::log_dir()?.display().to_string().cyan());
    println!();

    println!("Folders:");
    if settings.folders.is_empty() {
        println!("  {}", "(none configured)".dimmed());
    }
    for folder in &settings.folders {
        if folder.is_dir() {
            println!("  {} {}", "✓".green(), folder.display());
        } else {
            println!("  {} {} {}", "✗".red(), folder.display(), "(missing)".dimmed());
        }
    }

    Ok(())
}
