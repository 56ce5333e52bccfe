//! Stop the cheevo daemon

use anyhow::Result;
use cheevo_cli::{daemon, locks, util};
use owo_colors::OwoColorize;
use std::time::Duration;

pub async fn run() -> Result<()> {
    let state_dir = util::state_dir()?;

    let Some(info) = daemon::status(&state_dir) else {
        println!("{}", "Daemon is not running".yellow());
        return Ok(());
    };

    terminate(info.pid)?;

    // Give the daemon time to close its watcher and drop the lock
    for _ in 0..50 {
        if !locks::is_process_alive(info.pid) {
            println!("{} Daemon stopped (pid {})", "✓".green(), info.pid);
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Daemon (pid {}) did not exit within 5 seconds", info.pid)
}

#[cfg(unix)]
fn terminate(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)?;
    kill(Pid::from_raw(raw), Signal::SIGTERM)?;
    Ok(())
}

#[cfg(not(unix))]
fn terminate(pid: u32) -> Result<()> {
    anyhow::bail!(
        "Stopping the daemon is not supported on this platform; end process {} manually",
        pid
    )
}
