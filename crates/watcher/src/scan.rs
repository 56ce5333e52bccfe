//! One-shot tree walk for the initial scan
//!
//! Finds every file under a root that passes the same filter the watcher
//! applies to live events, so the first snapshot of each app is taken from
//! exactly the files that will later produce change events.

use crate::error::{Result, WatchError};
use crate::filter::PathFilter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Every file under `root` accepted by `filter`, sorted by path
///
/// Unreadable entries are logged and skipped; only a root that cannot be
/// stat'ed is an error.
pub fn find_matching_files(root: &Path, filter: &PathFilter) -> Result<Vec<PathBuf>> {
    match std::fs::metadata(root) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatchError::PathNotFound(root.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    }

    let mut matches = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };

        if entry.file_type().is_file() && filter.should_include(entry.path()) {
            matches.push(entry.into_path());
        }
    }

    matches.sort();
    debug!(
        root = %root.display(),
        matches = matches.len(),
        skipped,
        "Initial scan complete"
    );

    Ok(matches)
}
