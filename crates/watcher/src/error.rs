//! Error types for the watcher

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while setting up or driving a watcher
#[derive(Error, Debug)]
pub enum WatchError {
    /// OS watch primitive failed
    #[error("watch backend error: {0}")]
    Backend(String),

    /// Root passed to `add_root` does not exist
    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Watcher has been closed
    #[error("watcher is closed")]
    Closed,

    /// `start` was called twice
    #[error("watcher is already started")]
    AlreadyStarted,

    /// `start` was called outside a tokio runtime
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Root of a scan could not be stat'ed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

impl From<notify::Error> for WatchError {
    fn from(err: notify::Error) -> Self {
        WatchError::Backend(err.to_string())
    }
}
