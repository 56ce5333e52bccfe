//! Per-path debouncing
//!
//! Every raw notification for a path (re)arms one timer. The timer fires
//! once the path has been quiet for the configured period. Each timer is
//! its own sleeping task; a generation number stamps every arming so a
//! timer that was superseded while already waking up does nothing.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// How a burst of notifications started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// First notification was a create (or rename-into)
    Created,
    /// First notification was a content write
    Written,
}

/// Called with the path and burst origin when a timer fires
pub type FireCallback = Arc<dyn Fn(PathBuf, Origin) + Send + Sync>;

struct PendingTimer {
    origin: Origin,
    generation: u64,
    handle: JoinHandle<()>,
}

/// Per-path debouncer
pub struct Debouncer {
    quiet: Duration,
    pending: Arc<DashMap<PathBuf, PendingTimer>>,
    generation: AtomicU64,
    on_fire: FireCallback,
}

impl Debouncer {
    pub fn new(quiet: Duration, on_fire: FireCallback) -> Self {
        Self {
            quiet,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            on_fire,
        }
    }

    /// Record a notification for `path`, restarting its quiet period
    ///
    /// The origin of a burst is fixed by its first notification. Must be
    /// called from within a tokio runtime.
    pub fn touch(&self, path: PathBuf, origin: Origin) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        // Spawn under the entry lock so a zero-length timer cannot fire
        // before its entry exists.
        match self.pending.entry(path) {
            Entry::Occupied(mut entry) => {
                let handle = self.arm(entry.key().clone(), generation);
                let timer = entry.get_mut();
                timer.handle.abort();
                timer.handle = handle;
                timer.generation = generation;
            }
            Entry::Vacant(entry) => {
                let handle = self.arm(entry.key().clone(), generation);
                entry.insert(PendingTimer {
                    origin,
                    generation,
                    handle,
                });
            }
        }
    }

    /// Discard the pending timer for `path`, if any
    pub fn cancel(&self, path: &Path) -> bool {
        match self.pending.remove(path) {
            Some((_, timer)) => {
                timer.handle.abort();
                trace!(path = %path.display(), "Pending timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Abandon every pending timer
    pub fn clear(&self) {
        self.pending.retain(|_, timer| {
            timer.handle.abort();
            false
        });
    }

    /// Number of paths with an armed timer
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn arm(&self, path: PathBuf, generation: u64) -> JoinHandle<()> {
        let pending = Arc::clone(&self.pending);
        let on_fire = Arc::clone(&self.on_fire);
        let quiet = self.quiet;

        tokio::spawn(async move {
            tokio::time::sleep(quiet).await;

            let fired = pending.remove_if(&path, |_, timer| timer.generation == generation);
            if let Some((path, timer)) = fired {
                trace!(path = %path.display(), origin = ?timer.origin, "Quiet period elapsed");
                on_fire(path, timer.origin);
            }
        })
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("quiet", &self.quiet)
            .field("pending", &self.pending.len())
            .finish()
    }
}
