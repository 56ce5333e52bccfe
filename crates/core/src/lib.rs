//! Achievement state engine for cheevo
//!
//! This crate provides:
//! - Achievement snapshots keyed by achievement id
//! - Per-entity diff tracking with a notification-volume guard
//! - A cooldown gate for remote metadata refreshes
//! - Collaborator traits (parser, resolver, metadata, notifier)

pub mod clock;
pub mod error;
pub mod gate;
pub mod snapshot;
pub mod tracker;
pub mod traits;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{MetadataError, NotifyError, ParseError};
pub use gate::{RemoteCacheGate, DEFAULT_REFRESH_COOLDOWN};
pub use snapshot::{AchievementSnapshot, AchievementState, EntityId};
pub use tracker::{
    newly_unlocked, AchievementDiffTracker, DiffOutcome, DiffResult,
    DEFAULT_MAX_NOTIFY_ACHIEVEMENTS,
};
pub use traits::{
    AchievementInfo, Credentials, EntityResolver, FileFormat, MetadataSource, Notification,
    Notifier, SnapshotParser,
};
