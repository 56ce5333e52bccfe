//! Start the cheevo daemon

use anyhow::{Context, Result};
use cheevo_cli::{config, daemon, util};
use std::time::Duration;

pub async fn run(foreground: bool) -> Result<()> {
    let state_dir = util::state_dir()?;

    if let Some(info) = daemon::status(&state_dir) {
        anyhow::bail!("Daemon already running (pid {})", info.pid);
    }

    if foreground {
        let settings = config::load()?;
        daemon::run(settings, &state_dir).await
    } else {
        start_background(&state_dir).await
    }
}

async fn start_background(state_dir: &std::path::Path) -> Result<()> {
    use std::process::Command;

    // Fail here, before detaching, on a broken settings file
    config::load()?;

    let log_dir = util::log_dir()?;
    std::fs::create_dir_all(&log_dir).context("Failed to create logs directory")?;
    let log_file = log_dir.join("daemon.log");

    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    let log_file_writer = std::fs::File::create(&log_file).context("Failed to create log file")?;

    Command::new("nohup")
        .arg(&exe)
        .arg("start")
        .arg("--foreground")
        .stdout(log_file_writer.try_clone()?)
        .stderr(log_file_writer)
        .spawn()
        .context("Failed to spawn daemon process")?;

    // Wait a moment to verify it started
    tokio::time::sleep(Duration::from_millis(500)).await;

    if daemon::is_running(state_dir) {
        println!("Daemon started successfully");
        println!("Logs: {}", log_file.display());
        Ok(())
    } else {
        anyhow::bail!(
            "Daemon failed to start (check logs at {})",
            log_file.display()
        );
    }
}
