//! Daemon lifecycle management

use crate::config::Settings;
use crate::locks::{self, DaemonLock, LockInfo};
use crate::monitor::Monitor;
use crate::notifier::{DesktopNotifier, LogNotifier};
use anyhow::{Context, Result};
use cheevo_core::{AchievementDiffTracker, EntityId, Notifier, RemoteCacheGate};
use cheevo_steam::SteamMetadata;
use cheevo_watcher::{find_matching_files, DebouncedWatcher, PathFilter};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the monitor described by `settings`
pub fn build_monitor(settings: &Settings) -> Result<Monitor> {
    let metadata = SteamMetadata::new(settings.cache_dir()?, settings.steam_options())
        .context("Failed to set up metadata cache")?;

    let notifier: Arc<dyn Notifier> = if settings.notify.desktop {
        Arc::new(DesktopNotifier::new())
    } else {
        Arc::new(LogNotifier)
    };

    Ok(Monitor::new(Arc::new(metadata), notifier)
        .with_tracker(AchievementDiffTracker::new(
            settings.notify.max_notify_achievements,
        ))
        .with_gate(RemoteCacheGate::new(settings.refresh_cooldown()))
        .with_credentials(settings.credentials()))
}

/// Configured folders that exist; missing ones are logged and skipped
pub fn existing_folders(settings: &Settings) -> Vec<PathBuf> {
    settings
        .folders
        .iter()
        .filter(|folder| {
            let exists = folder.is_dir();
            if !exists {
                warn!(folder = %folder.display(), "Folder does not exist, skipping");
            }
            exists
        })
        .cloned()
        .collect()
}

/// Files found by the initial scan
#[derive(Debug, Default)]
pub struct ScanReport {
    pub files: Vec<PathBuf>,
    /// Entities whose files were seeded
    pub entities: BTreeSet<EntityId>,
}

/// Walk every folder and seed the tracker with what is already on disk
pub async fn initial_scan(monitor: &Monitor, folders: &[PathBuf], filter: &PathFilter) -> ScanReport {
    let mut report = ScanReport::default();

    for folder in folders {
        let files = match find_matching_files(folder, filter) {
            Ok(files) => files,
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "Failed to scan folder");
                continue;
            }
        };

        for file in files {
            if let Some(entity) = monitor.seed(&file).await {
                report.entities.insert(entity);
            }
            report.files.push(file);
        }
    }

    info!(
        files = report.files.len(),
        games = report.entities.len(),
        "Initial scan complete"
    );
    report
}

/// Run the daemon until Ctrl-C or SIGTERM
pub async fn run(settings: Settings, state_dir: &Path) -> Result<()> {
    let lock = DaemonLock::acquire(state_dir)?;
    info!(pid = std::process::id(), "Daemon starting");

    let monitor = Arc::new(build_monitor(&settings)?);
    let folders = existing_folders(&settings);
    let options = settings.watcher_options();
    let filter = PathFilter::new(&options.whitelist, &options.ignore);

    let report = initial_scan(&monitor, &folders, &filter).await;

    // Warm the metadata cache without holding up the watcher
    if settings.credentials().is_some() {
        let monitor = Arc::clone(&monitor);
        let entities = report.entities;
        tokio::spawn(async move {
            for entity in &entities {
                monitor.refresh_metadata(entity).await;
            }
        });
    } else {
        warn!("No Steam Web API key configured; notifications use cached metadata only");
    }

    let watcher = DebouncedWatcher::new(options).context("Failed to create watcher")?;
    for folder in &folders {
        let dirs = watcher
            .add_root(folder)
            .with_context(|| format!("Failed to watch {}", folder.display()))?;
        info!(folder = %folder.display(), directories = dirs, "Watching");
    }
    watcher.on_event(monitor);
    watcher.start().context("Failed to start watcher")?;

    info!(folders = folders.len(), "Daemon running");

    wait_for_shutdown().await?;

    info!("Daemon stopping");
    watcher.close();
    lock.release()?;
    Ok(())
}

/// The running daemon, if any
pub fn status(state_dir: &Path) -> Option<LockInfo> {
    locks::running_daemon(state_dir)
}

pub fn is_running(state_dir: &Path) -> bool {
    status(state_dir).is_some()
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
}
