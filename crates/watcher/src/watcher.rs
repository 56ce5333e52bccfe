//! The debounced watcher
//!
//! Raw notifications from `notify` are pushed into an unbounded channel by
//! the OS callback thread. A dispatch loop on the tokio runtime feeds them
//! to the [`Debouncer`]; when a path's timer fires the path is re-stat'ed,
//! classified, filtered and handed to every listener on its own task.

use crate::debounce::{Debouncer, Origin};
use crate::error::{Result, WatchError};
use crate::filter::PathFilter;
use crate::{EventKind, WatchEvent};
use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Quiet period before a burst settles (default: 100ms)
    pub debounce: Duration,
    /// Register subdirectories, including ones created later (default: true)
    pub recursive: bool,
    /// Patterns a path must match; empty means everything
    pub whitelist: Vec<String>,
    /// Patterns that exclude a path
    pub ignore: Vec<String>,
    /// Deliver `Removed` events (default: false)
    pub emit_removals: bool,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            recursive: true,
            whitelist: Vec::new(),
            ignore: Vec::new(),
            emit_removals: false,
        }
    }
}

/// Receives settled events
#[async_trait]
pub trait WatchListener: Send + Sync + 'static {
    async fn on_event(&self, event: WatchEvent);
}

/// Adapts an async closure into a [`WatchListener`]
pub struct FnListener<F>(F);

impl<F> FnListener<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> WatchListener for FnListener<F>
where
    F: Fn(WatchEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn on_event(&self, event: WatchEvent) {
        (self.0)(event).await
    }
}

/// Low-level action derived from one raw notification
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawAction {
    Touch(PathBuf, Origin),
    Remove(PathBuf),
}

/// Map a raw notify event onto debounce actions
fn classify(event: Event) -> Vec<RawAction> {
    use notify::EventKind as Kind;

    let mut paths = event.paths.into_iter();

    match event.kind {
        Kind::Create(_) => paths.map(|p| RawAction::Touch(p, Origin::Created)).collect(),
        Kind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
            paths.map(|p| RawAction::Touch(p, Origin::Written)).collect()
        }
        Kind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => paths.map(RawAction::Remove).collect(),
            RenameMode::To => paths.map(|p| RawAction::Touch(p, Origin::Created)).collect(),
            RenameMode::Both => {
                let mut actions = Vec::with_capacity(2);
                if let Some(from) = paths.next() {
                    actions.push(RawAction::Remove(from));
                }
                if let Some(to) = paths.next() {
                    actions.push(RawAction::Touch(to, Origin::Created));
                }
                actions
            }
            RenameMode::Any | RenameMode::Other => paths
                .map(|p| {
                    if p.exists() {
                        RawAction::Touch(p, Origin::Created)
                    } else {
                        RawAction::Remove(p)
                    }
                })
                .collect(),
        },
        Kind::Remove(_) => paths.map(RawAction::Remove).collect(),
        Kind::Modify(ModifyKind::Metadata(_)) | Kind::Access(_) | Kind::Any | Kind::Other => {
            Vec::new()
        }
    }
}

/// A root and the directories registered beneath it
#[derive(Debug)]
struct WatchedTree {
    root: PathBuf,
    dirs: BTreeSet<PathBuf>,
}

struct Registry {
    /// `None` once closed
    watcher: Option<RecommendedWatcher>,
    trees: Vec<WatchedTree>,
}

impl Registry {
    /// Drop bookkeeping for `dir` and everything beneath it
    ///
    /// A recreated directory must be watched again even if an earlier
    /// directory at the same path was registered.
    fn forget_under(&mut self, dir: &Path) {
        for tree in &mut self.trees {
            tree.dirs.retain(|d| !d.starts_with(dir));
        }
    }

    /// Register `dirs` under the tree rooted at `root`, creating it if needed
    fn register(&mut self, root: &Path, dirs: Vec<PathBuf>) -> Result<usize> {
        let mut fresh = Vec::new();
        {
            let watcher = self.watcher.as_mut().ok_or(WatchError::Closed)?;
            for dir in dirs {
                if self.trees.iter().any(|tree| tree.dirs.contains(&dir)) {
                    continue;
                }
                match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                    Ok(()) => fresh.push(dir),
                    Err(e) if dir == root => return Err(e.into()),
                    Err(e) => {
                        warn!(path = %dir.display(), error = %e, "Failed to watch directory, skipping");
                    }
                }
            }
        }

        let count = fresh.len();
        let tree = match self.trees.iter_mut().position(|tree| root.starts_with(&tree.root)) {
            Some(index) => &mut self.trees[index],
            None => {
                self.trees.push(WatchedTree {
                    root: root.to_path_buf(),
                    dirs: BTreeSet::new(),
                });
                let last = self.trees.len() - 1;
                &mut self.trees[last]
            }
        };
        tree.dirs.extend(fresh);

        Ok(count)
    }
}

/// Directories under `root`, including `root`; just `root` when not recursive
fn collect_dirs(root: &Path, recursive: bool) -> Vec<PathBuf> {
    if !recursive || !root.is_dir() {
        return vec![root.to_path_buf()];
    }

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .collect()
}

struct Receivers {
    raw: mpsc::UnboundedReceiver<notify::Result<Event>>,
    fired: mpsc::UnboundedReceiver<(PathBuf, Origin)>,
}

struct Inner {
    options: WatcherOptions,
    filter: PathFilter,
    registry: Mutex<Registry>,
    debouncer: Debouncer,
    listeners: RwLock<Vec<Arc<dyn WatchListener>>>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    /// Taken by `start`
    receivers: Mutex<Option<Receivers>>,
}

impl Inner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn handle_raw(&self, result: notify::Result<Event>) {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Watch backend error");
                return;
            }
        };

        for action in classify(event) {
            match action {
                RawAction::Touch(path, origin) => self.debouncer.touch(path, origin),
                RawAction::Remove(path) => self.removed(path),
            }
        }
    }

    fn removed(&self, path: PathBuf) {
        self.debouncer.cancel(&path);

        if self.options.emit_removals && self.filter.should_include(&path) {
            self.dispatch(WatchEvent::new(EventKind::Removed, path));
        }
    }

    /// Classify a path whose quiet period has elapsed
    async fn settle(self: Arc<Self>, path: PathBuf, origin: Origin) {
        if self.is_closed() {
            return;
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "Path vanished before settling");
                return;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat path");
                return;
            }
        };

        if metadata.is_dir() {
            if origin == Origin::Created && self.options.recursive {
                self.adopt_directory(path).await;
            }
            return;
        }

        let kind = match origin {
            Origin::Created => EventKind::Added,
            Origin::Written => EventKind::Changed,
        };

        if self.filter.should_include(&path) {
            self.dispatch(WatchEvent::new(kind, path));
        } else {
            trace!(path = %path.display(), "Filtered out");
        }
    }

    /// Register a newly created directory and report files already inside it
    async fn adopt_directory(self: Arc<Self>, dir: PathBuf) {
        let inner = Arc::clone(&self);
        let swept = tokio::task::spawn_blocking(move || {
            let dirs = collect_dirs(&dir, true);
            let added = {
                let mut registry = inner.registry.lock();
                registry.forget_under(&dir);
                registry.register(&dir, dirs)?
            };

            // Files written before the directory was registered produce no
            // notification of their own.
            let files = WalkDir::new(&dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| inner.filter.should_include(path))
                .collect::<Vec<_>>();

            Ok::<_, WatchError>((dir, added, files))
        })
        .await;

        match swept {
            Ok(Ok((dir, added, files))) => {
                if added > 0 {
                    debug!(path = %dir.display(), directories = added, "Registered new directory");
                }
                for file in files {
                    self.dispatch(WatchEvent::new(EventKind::Added, file));
                }
            }
            Ok(Err(WatchError::Closed)) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to register new directory"),
            Err(e) => warn!(error = %e, "Directory registration task failed"),
        }
    }

    fn dispatch(&self, event: WatchEvent) {
        let listeners = self.listeners.read().clone();
        debug!(
            kind = ?event.kind,
            path = %event.path.display(),
            listeners = listeners.len(),
            "Dispatching event"
        );

        for listener in listeners {
            let event = event.clone();
            tokio::spawn(async move {
                listener.on_event(event).await;
            });
        }
    }
}

/// Debounced, filtered, recursive directory watcher
///
/// Dropping the watcher closes it.
pub struct DebouncedWatcher {
    inner: Arc<Inner>,
}

impl DebouncedWatcher {
    /// Create a watcher; fails if the OS watch primitive is unavailable
    pub fn new(options: WatcherOptions) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                // Receiver is gone only after close
                let _ = raw_tx.send(result);
            },
            notify::Config::default(),
        )?;

        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(
            options.debounce,
            Arc::new(move |path: PathBuf, origin: Origin| {
                let _ = fired_tx.send((path, origin));
            }),
        );

        let filter = PathFilter::new(&options.whitelist, &options.ignore);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(Inner {
                options,
                filter,
                registry: Mutex::new(Registry {
                    watcher: Some(watcher),
                    trees: Vec::new(),
                }),
                debouncer,
                listeners: RwLock::new(Vec::new()),
                closed: AtomicBool::new(false),
                shutdown,
                receivers: Mutex::new(Some(Receivers {
                    raw: raw_rx,
                    fired: fired_rx,
                })),
            }),
        })
    }

    /// Watch `path` and, when recursive, every directory beneath it
    ///
    /// Returns the number of directories newly registered.
    pub fn add_root(&self, path: impl AsRef<Path>) -> Result<usize> {
        if self.is_closed() {
            return Err(WatchError::Closed);
        }

        let root = path.as_ref();
        if !root.exists() {
            return Err(WatchError::PathNotFound(root.to_path_buf()));
        }

        let dirs = collect_dirs(root, self.inner.options.recursive);
        let added = self.inner.registry.lock().register(root, dirs)?;

        info!(root = %root.display(), directories = added, "Watching root");
        Ok(added)
    }

    /// Register a listener
    pub fn on_event(&self, listener: Arc<dyn WatchListener>) {
        self.inner.listeners.write().push(listener);
    }

    /// Register an async closure as a listener
    pub fn on_event_fn<F, Fut>(&self, f: F)
    where
        F: Fn(WatchEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_event(Arc::new(FnListener::new(f)));
    }

    /// Spawn the dispatch loop on the current runtime
    pub fn start(&self) -> Result<()> {
        if self.is_closed() {
            return Err(WatchError::Closed);
        }

        let handle = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let receivers = self
            .inner
            .receivers
            .lock()
            .take()
            .ok_or(WatchError::AlreadyStarted)?;

        let inner = Arc::clone(&self.inner);
        let shutdown = self.inner.shutdown.subscribe();
        handle.spawn(run_loop(inner, receivers, shutdown));

        debug!(debounce = ?self.inner.options.debounce, "Watcher started");
        Ok(())
    }

    /// Stop watching
    ///
    /// Idempotent. Releases the OS handle, stops the dispatch loop and
    /// abandons pending timers. Listener tasks already spawned still run.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Dropped outside the lock; some backends join a thread on drop
        let watcher = self.inner.registry.lock().watcher.take();
        drop(watcher);

        self.inner.shutdown.send_replace(true);
        self.inner.debouncer.clear();

        info!("Watcher closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn options(&self) -> &WatcherOptions {
        &self.inner.options
    }

    /// Every directory currently registered with the OS source, sorted
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        let registry = self.inner.registry.lock();
        let mut dirs: Vec<PathBuf> = registry
            .trees
            .iter()
            .flat_map(|tree| tree.dirs.iter().cloned())
            .collect();
        dirs.sort();
        dirs
    }

    /// Roots passed to `add_root`
    pub fn roots(&self) -> Vec<PathBuf> {
        self.inner
            .registry
            .lock()
            .trees
            .iter()
            .map(|tree| tree.root.clone())
            .collect()
    }

    /// Paths with a burst still being coalesced
    pub fn pending_timers(&self) -> usize {
        self.inner.debouncer.len()
    }
}

impl Drop for DebouncedWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for DebouncedWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebouncedWatcher")
            .field("options", &self.inner.options)
            .field("roots", &self.roots())
            .field("pending_timers", &self.pending_timers())
            .field("listeners", &self.inner.listeners.read().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn run_loop(
    inner: Arc<Inner>,
    mut receivers: Receivers,
    mut shutdown: watch::Receiver<bool>,
) {
    // Closed between `start`'s check and `subscribe`
    if *shutdown.borrow() {
        return;
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            Some(result) = receivers.raw.recv() => inner.handle_raw(result),
            Some((path, origin)) = receivers.fired.recv() => {
                tokio::spawn(Arc::clone(&inner).settle(path, origin));
            }
            else => break,
        }
    }

    debug!("Dispatch loop stopped");
}
