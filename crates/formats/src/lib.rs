//! Achievement file formats for cheevo
//!
//! Emulators and cracks store unlock state in one of two shapes:
//! - INI: one section per achievement with an `Achieved=`-style flag
//! - JSON: an object keyed by achievement id
//!
//! The app id is taken from the path, where every known layout has the
//! numeric Steam app id as a directory name.

pub mod appid;
pub mod ini;
pub mod json;

pub use appid::AppIdResolver;

use cheevo_core::{AchievementSnapshot, FileFormat, ParseError, SnapshotParser};

/// Parses both supported achievement file formats
#[derive(Debug, Clone, Copy, Default)]
pub struct AchievementFileParser;

impl AchievementFileParser {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotParser for AchievementFileParser {
    fn parse(&self, content: &str, format: FileFormat) -> Result<AchievementSnapshot, ParseError> {
        // Some tools write a UTF-8 byte order mark
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let snapshot = match format {
            FileFormat::Ini => ini::parse(content),
            FileFormat::Json => json::parse(content),
        }?;

        tracing::trace!(
            ?format,
            achievements = snapshot.len(),
            unlocked = snapshot.unlocked_count(),
            "Parsed achievement file"
        );
        Ok(snapshot)
    }
}
