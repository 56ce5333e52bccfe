//! Achievement monitor
//!
//! Turns settled file events into unlock notifications: resolve the app,
//! refresh metadata (gated), parse the file, diff it against the last known
//! snapshot and notify for each newly unlocked achievement.

use async_trait::async_trait;
use cheevo_core::{
    AchievementDiffTracker, AchievementSnapshot, Credentials, EntityId, EntityResolver,
    FileFormat, MetadataSource, Notification, Notifier, RemoteCacheGate, SnapshotParser,
};
use cheevo_formats::{AchievementFileParser, AppIdResolver};
use cheevo_watcher::{EventKind, WatchEvent, WatchListener};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event handler shared by the initial scan and the watcher
pub struct Monitor {
    resolver: Arc<dyn EntityResolver>,
    parser: Arc<dyn SnapshotParser>,
    metadata: Arc<dyn MetadataSource>,
    notifier: Arc<dyn Notifier>,
    tracker: AchievementDiffTracker,
    gate: RemoteCacheGate,
    credentials: Option<Credentials>,
}

impl Monitor {
    /// Monitor with the app-id resolver, the INI/JSON parser and default guards
    pub fn new(metadata: Arc<dyn MetadataSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            resolver: Arc::new(AppIdResolver::new()),
            parser: Arc::new(AchievementFileParser::new()),
            metadata,
            notifier,
            tracker: AchievementDiffTracker::default(),
            gate: RemoteCacheGate::default(),
            credentials: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn SnapshotParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_tracker(mut self, tracker: AchievementDiffTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_gate(mut self, gate: RemoteCacheGate) -> Self {
        self.gate = gate;
        self
    }

    /// Without credentials metadata is never fetched, only read from cache
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn tracker(&self) -> &AchievementDiffTracker {
        &self.tracker
    }

    pub fn resolve(&self, path: &Path) -> Option<EntityId> {
        self.resolver.resolve(path)
    }

    /// Read and parse an achievement file
    pub async fn read_snapshot(&self, path: &Path) -> anyhow::Result<AchievementSnapshot> {
        let format = FileFormat::from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(self.parser.parse(&content, format)?)
    }

    /// Record a file's current state without notifying
    ///
    /// Returns the entity the file belongs to, or `None` when the path has
    /// no entity or the file cannot be read.
    pub async fn seed(&self, path: &Path) -> Option<EntityId> {
        let entity = self.resolve(path)?;

        match self.read_snapshot(path).await {
            Ok(snapshot) => {
                self.tracker.initialize(&entity, snapshot);
                Some(entity)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable achievement file");
                None
            }
        }
    }

    /// Refresh cached metadata for `entity` unless it is cooling down
    ///
    /// Returns whether a refresh was attempted.
    pub async fn refresh_metadata(&self, entity: &EntityId) -> bool {
        let Some(credentials) = &self.credentials else {
            return false;
        };
        if !self.gate.should_refresh(entity) {
            return false;
        }

        if let Err(e) = self.metadata.ensure_cached(entity, credentials).await {
            warn!(entity = %entity, error = %e, "Failed to refresh achievement metadata");
        }
        true
    }

    /// Process one settled event; returns the number of notifications shown
    pub async fn handle(&self, event: &WatchEvent) -> usize {
        if event.kind == EventKind::Removed {
            return 0;
        }

        let Some(entity) = self.resolve(&event.path) else {
            debug!(path = %event.path.display(), "No app id in path");
            return 0;
        };

        self.refresh_metadata(&entity).await;

        let snapshot = match self.read_snapshot(&event.path).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %event.path.display(), error = %e, "Failed to read achievement file");
                return 0;
            }
        };

        let diff = self.tracker.update(&entity, snapshot);
        if diff.is_empty() {
            return 0;
        }

        info!(entity = %entity, unlocked = diff.len(), "New achievements");

        let mut shown = 0;
        for achievement in diff.unlocked() {
            if self.announce(&entity, achievement).await {
                shown += 1;
            }
        }
        shown
    }

    async fn announce(&self, entity: &EntityId, achievement: &str) -> bool {
        let info = match self.metadata.lookup(entity, achievement).await {
            Ok(info) => info,
            Err(e) => {
                warn!(entity = %entity, achievement, error = %e, "No metadata for achievement");
                return false;
            }
        };

        let icon = match &info.icon {
            Some(icon) => match self.metadata.icon_path(entity, icon).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(entity = %entity, achievement, error = %e, "Failed to fetch icon");
                    None
                }
            },
            None => None,
        };

        let notification = Notification::new(info.display_name, info.description).with_icon(icon);
        match self.notifier.notify(&notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(entity = %entity, achievement, error = %e, "Failed to show notification");
                false
            }
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("tracked", &self.tracker.tracked_entities().len())
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WatchListener for Monitor {
    async fn on_event(&self, event: WatchEvent) {
        self.handle(&event).await;
    }
}
