//! Lock file management for daemon exclusivity

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "daemon.lock";

/// Held for the lifetime of a running daemon
#[derive(Debug)]
pub struct DaemonLock {
    path: PathBuf,
    // Keeps the flock alive
    _file: File,
}

/// Lock file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl DaemonLock {
    /// Acquire the exclusive daemon lock under `state_dir`
    ///
    /// Fails if another live process holds it. A lock left behind by a dead
    /// process is removed and acquisition is retried once.
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        Self::acquire_inner(state_dir, true)
    }

    fn acquire_inner(state_dir: &Path, retry: bool) -> Result<Self> {
        let lock_path = lock_path(state_dir);

        std::fs::create_dir_all(state_dir).context("Failed to create state directory")?;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_lock_exclusive(&mut file)? {
            if retry && is_stale_lock(&mut file) {
                tracing::warn!(path = %lock_path.display(), "Removing stale daemon lock");
                drop(file);
                std::fs::remove_file(&lock_path)?;
                return Self::acquire_inner(state_dir, false);
            }
            anyhow::bail!("Daemon already running (lock file held by active process)");
        }

        write_lock_info(&mut file)?;

        Ok(Self {
            path: lock_path,
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove the lock file
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE)
}

/// Read the lock file under `state_dir`
///
/// `None` when there is no lock file or it cannot be parsed.
pub fn read_lock_info(state_dir: &Path) -> Option<LockInfo> {
    let contents = std::fs::read_to_string(lock_path(state_dir)).ok()?;
    serde_json::from_str(&contents).ok()
}

/// The running daemon, if the lock file names a live process
pub fn running_daemon(state_dir: &Path) -> Option<LockInfo> {
    read_lock_info(state_dir).filter(|info| is_process_alive(info.pid))
}

fn is_stale_lock(file: &mut File) -> bool {
    match read_from(file) {
        Ok(info) => !is_process_alive(info.pid),
        // Unreadable content means the writer never finished
        Err(_) => true,
    }
}

fn write_lock_info(file: &mut File) -> Result<()> {
    let info = LockInfo {
        pid: std::process::id(),
        started_at: Utc::now(),
    };

    let serialized = serde_json::to_string(&info).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_from(file: &mut File) -> Result<LockInfo> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Try to take an exclusive advisory lock (non-blocking)
#[cfg(unix)]
fn try_lock_exclusive(file: &mut File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Without flock the pid in the file is the only ownership record
#[cfg(not(unix))]
fn try_lock_exclusive(file: &mut File) -> Result<bool> {
    match read_from(file) {
        Ok(info) => Ok(info.pid != std::process::id() && !is_process_alive(info.pid)),
        Err(_) => Ok(true),
    }
}

/// Check if a process is alive
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    // Null signal: existence check only
    match kill(Pid::from_raw(raw), None::<Signal>) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // EPERM: exists but owned by someone else
        Err(_) => true,
    }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    // Conservative: assume alive when the platform offers no cheap check
    true
}
