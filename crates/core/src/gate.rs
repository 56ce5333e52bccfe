//! Cooldown gate for remote metadata refreshes
//!
//! A game that truncates and rewrites its achievement file fires two change
//! events a few milliseconds apart. Each would otherwise trigger its own
//! metadata refresh for the same app.

use crate::clock::{Clock, SystemClock};
use crate::snapshot::EntityId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Default cooldown between two refreshes of the same entity
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(5);

/// Entries above this count trigger eviction of expired ones
const EVICTION_THRESHOLD: usize = 1024;

/// Per-entity rate limiter for refresh triggers
#[derive(Debug)]
pub struct RemoteCacheGate<C: Clock = SystemClock> {
    cooldown: Duration,
    clock: C,
    /// Entity id -> last time a refresh was allowed
    last_refresh: DashMap<EntityId, Instant>,
}

impl Default for RemoteCacheGate {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_COOLDOWN)
    }
}

impl RemoteCacheGate {
    /// Create a gate on the system clock
    pub fn new(cooldown: Duration) -> Self {
        Self::with_clock(cooldown, SystemClock)
    }
}

impl<C: Clock> RemoteCacheGate<C> {
    /// Create a gate on a custom clock
    pub fn with_clock(cooldown: Duration, clock: C) -> Self {
        Self {
            cooldown,
            clock,
            last_refresh: DashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether a refresh for `entity` may start now
    ///
    /// Records the current time when it returns true. A false answer leaves
    /// the recorded time alone, so the window is measured from the last
    /// allowed refresh rather than the last request.
    pub fn should_refresh(&self, entity: &EntityId) -> bool {
        let now = self.clock.now();

        let allowed = match self.last_refresh.entry(entity.clone()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) < self.cooldown {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };

        if !allowed {
            trace!(entity = %entity, "Refresh still cooling down");
        } else if self.last_refresh.len() > EVICTION_THRESHOLD {
            self.evict_expired(now);
        }

        allowed
    }

    /// Number of entities with a recorded refresh
    pub fn len(&self) -> usize {
        self.last_refresh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_refresh.is_empty()
    }

    fn evict_expired(&self, now: Instant) {
        let cooldown = self.cooldown;
        self.last_refresh
            .retain(|_, last| now.saturating_duration_since(*last) < cooldown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_cooldown_window() {
        let clock = Arc::new(ManualClock::new());
        let gate = RemoteCacheGate::with_clock(Duration::from_secs(5), Arc::clone(&clock));
        let app = EntityId::from("480");

        assert!(gate.should_refresh(&app));
        assert!(!gate.should_refresh(&app));

        clock.advance(Duration::from_millis(4_999));
        assert!(!gate.should_refresh(&app));

        clock.advance(Duration::from_millis(1));
        assert!(gate.should_refresh(&app));
        assert!(!gate.should_refresh(&app));
    }

    #[test]
    fn test_rejected_calls_do_not_extend_window() {
        let clock = Arc::new(ManualClock::new());
        let gate = RemoteCacheGate::with_clock(Duration::from_secs(5), Arc::clone(&clock));
        let app = EntityId::from("480");

        assert!(gate.should_refresh(&app));
        for _ in 0..4 {
            clock.advance(Duration::from_secs(1));
            assert!(!gate.should_refresh(&app));
        }
        clock.advance(Duration::from_secs(1));
        assert!(gate.should_refresh(&app));
    }

    #[test]
    fn test_entities_are_independent() {
        let gate = RemoteCacheGate::with_clock(Duration::from_secs(5), ManualClock::new());

        assert!(gate.should_refresh(&EntityId::from("1")));
        assert!(gate.should_refresh(&EntityId::from("2")));
        assert!(!gate.should_refresh(&EntityId::from("1")));
        assert_eq!(gate.len(), 2);
    }

    #[test]
    fn test_concurrent_same_entity_allows_exactly_one() {
        let gate = Arc::new(RemoteCacheGate::with_clock(
            Duration::from_secs(5),
            ManualClock::new(),
        ));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.should_refresh(&EntityId::from("480")))
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(allowed, 1);
    }

    #[test]
    fn test_expired_entries_are_evicted() {
        let clock = Arc::new(ManualClock::new());
        let gate = RemoteCacheGate::with_clock(Duration::from_secs(5), Arc::clone(&clock));

        for i in 0..EVICTION_THRESHOLD {
            assert!(gate.should_refresh(&EntityId::new(i.to_string())));
        }
        clock.advance(Duration::from_secs(6));
        assert!(gate.should_refresh(&EntityId::from("fresh")));

        assert_eq!(gate.len(), 1);
    }
}
