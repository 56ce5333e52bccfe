//! Debounced file system watching for cheevo
//!
//! This crate provides:
//! - Recursive directory registration, including subdirectories created later
//! - Per-path debouncing of raw OS notifications
//! - Classification into added / changed / removed events
//! - Whitelist/ignore path filtering
//! - A one-shot tree walk for the initial scan

pub mod debounce;
pub mod error;
pub mod filter;
pub mod scan;
pub mod watcher;

pub use error::{Result, WatchError};
pub use filter::{should_include, PathFilter};
pub use scan::find_matching_files;
pub use watcher::{DebouncedWatcher, FnListener, WatchListener, WatcherOptions};

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A settled file system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Type of change
    pub kind: EventKind,
    /// Path that changed
    pub path: PathBuf,
    /// When the event was classified
    pub observed_at: DateTime<Utc>,
}

impl WatchEvent {
    pub fn new(kind: EventKind, path: PathBuf) -> Self {
        Self {
            kind,
            path,
            observed_at: Utc::now(),
        }
    }
}

/// Type of settled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// File appeared
    Added,
    /// File content changed
    Changed,
    /// File was removed or renamed away
    Removed,
}
