//! Achievement snapshots and entity identifiers

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier grouping all achievement state for one tracked application
///
/// Usually the numeric Steam app id found somewhere in the file's path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// State of a single achievement as read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementState {
    /// Whether the achievement is unlocked
    pub achieved: bool,
    /// Name shown when no remote metadata is available
    pub display_name: String,
}

impl AchievementState {
    /// A locked achievement
    pub fn locked(display_name: impl Into<String>) -> Self {
        Self {
            achieved: false,
            display_name: display_name.into(),
        }
    }

    /// An unlocked achievement
    pub fn unlocked(display_name: impl Into<String>) -> Self {
        Self {
            achieved: true,
            display_name: display_name.into(),
        }
    }
}

/// Complete set of achievements parsed from one read of a state file
///
/// Entries are ordered by achievement id, so anything derived from a
/// snapshot (diffs in particular) comes out sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementSnapshot {
    entries: BTreeMap<String, AchievementState>,
}

impl AchievementSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an achievement, returning the previous state
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        state: AchievementState,
    ) -> Option<AchievementState> {
        self.entries.insert(id.into(), state)
    }

    /// Get the state of an achievement
    pub fn get(&self, id: &str) -> Option<&AchievementState> {
        self.entries.get(id)
    }

    /// Check whether an achievement id is present
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Check whether an achievement is present and unlocked
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(|state| state.achieved)
    }

    /// Number of achievements in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no achievements
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of unlocked achievements
    pub fn unlocked_count(&self) -> usize {
        self.entries.values().filter(|state| state.achieved).count()
    }

    /// Iterate achievements in id order
    pub fn iter(&self) -> btree_map::Iter<'_, String, AchievementState> {
        self.entries.iter()
    }
}

impl FromIterator<(String, AchievementState)> for AchievementSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, AchievementState)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a AchievementSnapshot {
    type Item = (&'a String, &'a AchievementState);
    type IntoIter = btree_map::Iter<'a, String, AchievementState>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
