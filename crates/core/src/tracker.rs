//! Per-entity achievement diffing
//!
//! Turns "a fresh snapshot arrived for entity E" into "these achievement ids
//! were just unlocked". Two situations must not produce notifications:
//! - the first load of a file that already has many unlocks
//! - bulk rewrites and half-written intermediate states from the game
//!
//! Both show up as more simultaneous unlocks than a player can plausibly earn
//! at once, so any diff above the ceiling is suppressed. A suppressed diff
//! leaves the stored snapshot untouched: the next event re-diffs against the
//! same baseline and a genuine unlock is still seen.

use crate::snapshot::{AchievementSnapshot, EntityId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of simultaneous unlocks treated as genuine
pub const DEFAULT_MAX_NOTIFY_ACHIEVEMENTS: usize = 2;

/// How an update was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Unlocks within the ceiling; stored snapshot replaced
    Accepted,
    /// Nothing newly unlocked; stored snapshot kept
    Unchanged,
    /// Too many unlocks at once; stored snapshot kept
    Suppressed {
        /// Number of transitions that were found
        candidates: usize,
    },
}

/// Achievement ids that newly became unlocked, sorted by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    unlocked: Vec<String>,
    outcome: DiffOutcome,
}

impl DiffResult {
    fn accepted(unlocked: Vec<String>) -> Self {
        Self {
            unlocked,
            outcome: DiffOutcome::Accepted,
        }
    }

    fn unchanged() -> Self {
        Self {
            unlocked: Vec::new(),
            outcome: DiffOutcome::Unchanged,
        }
    }

    fn suppressed(candidates: usize) -> Self {
        Self {
            unlocked: Vec::new(),
            outcome: DiffOutcome::Suppressed { candidates },
        }
    }

    /// Newly unlocked achievement ids (empty unless accepted)
    pub fn unlocked(&self) -> &[String] {
        &self.unlocked
    }

    /// Consume the result, returning the unlocked ids
    pub fn into_unlocked(self) -> Vec<String> {
        self.unlocked
    }

    /// How the update was resolved
    pub fn outcome(&self) -> DiffOutcome {
        self.outcome
    }

    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.unlocked.len()
    }
}

/// Ids unlocked in `new` that were absent or locked in `old`
///
/// Ids that appear locked in `new` are never transitions, whether or not
/// `old` knew about them.
pub fn newly_unlocked(old: &AchievementSnapshot, new: &AchievementSnapshot) -> Vec<String> {
    new.iter()
        .filter(|(id, state)| state.achieved && !old.is_unlocked(id))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Last known snapshot per entity, plus the unlock guard
///
/// Every entity owns its own lock, held across read-diff-write, so two
/// updates for one entity cannot both diff against the same stale snapshot.
/// Updates for different entities never wait on each other.
#[derive(Debug)]
pub struct AchievementDiffTracker {
    /// Maximum simultaneous unlocks that are reported
    max_notify: usize,
    /// Entity id -> stored snapshot
    entities: DashMap<EntityId, Arc<Mutex<AchievementSnapshot>>>,
}

impl Default for AchievementDiffTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NOTIFY_ACHIEVEMENTS)
    }
}

impl AchievementDiffTracker {
    /// Create a tracker with the given guard ceiling
    pub fn new(max_notify: usize) -> Self {
        Self {
            max_notify,
            entities: DashMap::new(),
        }
    }

    /// Guard ceiling
    pub fn max_notify(&self) -> usize {
        self.max_notify
    }

    /// Seed the stored snapshot without producing a diff
    ///
    /// Called for files found by the startup scan so achievements unlocked
    /// before the daemon ran are not announced.
    pub fn initialize(&self, entity: &EntityId, snapshot: AchievementSnapshot) {
        debug!(
            entity = %entity,
            achievements = snapshot.len(),
            unlocked = snapshot.unlocked_count(),
            "Seeding achievement snapshot"
        );
        let slot = self.slot(entity);
        *slot.lock() = snapshot;
    }

    /// Diff a fresh snapshot against the stored one
    pub fn update(&self, entity: &EntityId, snapshot: AchievementSnapshot) -> DiffResult {
        let slot = self.slot(entity);
        let mut stored = slot.lock();

        let unlocked = newly_unlocked(&stored, &snapshot);
        match unlocked.len() {
            0 => DiffResult::unchanged(),
            n if n <= self.max_notify => {
                *stored = snapshot;
                debug!(entity = %entity, unlocked = n, "Accepted achievement diff");
                DiffResult::accepted(unlocked)
            }
            n => {
                info!(
                    entity = %entity,
                    candidates = n,
                    ceiling = self.max_notify,
                    "Suppressing unlock burst"
                );
                DiffResult::suppressed(n)
            }
        }
    }

    /// Copy of the stored snapshot for an entity
    pub fn snapshot(&self, entity: &EntityId) -> Option<AchievementSnapshot> {
        let slot = self.entities.get(entity).map(|slot| Arc::clone(slot.value()))?;
        let snapshot = slot.lock().clone();
        Some(snapshot)
    }

    /// Entities with stored state
    pub fn tracked_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Drop the stored snapshot for an entity
    pub fn forget(&self, entity: &EntityId) -> bool {
        self.entities.remove(entity).is_some()
    }

    /// Get or create the per-entity slot
    ///
    /// The `Arc` is cloned out so the map shard is not held while the
    /// entity lock is.
    fn slot(&self, entity: &EntityId) -> Arc<Mutex<AchievementSnapshot>> {
        if let Some(slot) = self.entities.get(entity) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.entities.entry(entity.clone()).or_default().value())
    }
}
