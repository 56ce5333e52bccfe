//! Collaborator traits
//!
//! The engine never reads file formats, talks to the network or shows UI
//! itself. Everything outside the diff/gate logic is reached through these
//! traits so each piece can be swapped or faked in tests.

use crate::error::{MetadataError, NotifyError, ParseError};
use crate::snapshot::{AchievementSnapshot, EntityId};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// On-disk achievement file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Ini,
    Json,
}

impl FileFormat {
    /// Derive the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "ini" => Ok(Self::Ini),
            "json" => Ok(Self::Json),
            _ => Err(ParseError::UnsupportedFormat(format!(".{ext}"))),
        }
    }
}

/// Turns file content into a snapshot
pub trait SnapshotParser: Send + Sync {
    fn parse(&self, content: &str, format: FileFormat) -> Result<AchievementSnapshot, ParseError>;
}

/// Derives an entity id from a file path
pub trait EntityResolver: Send + Sync {
    /// `None` means the path belongs to no entity and the event is ignored
    fn resolve(&self, path: &Path) -> Option<EntityId>;
}

/// API credentials for the metadata source
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// `None` when the key is blank
    pub fn from_key(api_key: &str) -> Option<Self> {
        let key = api_key.trim();
        (!key.is_empty()).then(|| Self::new(key))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// Remote description of one achievement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementInfo {
    /// Internal achievement id
    pub id: String,
    pub display_name: String,
    pub description: String,
    /// Icon reference (URL) if the achievement has one
    pub icon: Option<String>,
}

/// Achievement metadata and icon cache
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Make sure metadata for `entity` is cached and fresh
    async fn ensure_cached(
        &self,
        entity: &EntityId,
        credentials: &Credentials,
    ) -> Result<(), MetadataError>;

    /// Look up one achievement in the cached metadata
    async fn lookup(
        &self,
        entity: &EntityId,
        achievement: &str,
    ) -> Result<AchievementInfo, MetadataError>;

    /// Resolve an icon reference to a local file
    async fn icon_path(&self, entity: &EntityId, icon: &str) -> Result<PathBuf, MetadataError>;
}

/// A notification ready to be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: Option<PathBuf>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: Option<PathBuf>) -> Self {
        self.icon = icon;
        self
    }
}

/// Shows notifications to the user
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            FileFormat::from_path(Path::new("/g/480/achievements.ini")).unwrap(),
            FileFormat::Ini
        );
        assert_eq!(
            FileFormat::from_path(Path::new("/g/480/Achievements.JSON")).unwrap(),
            FileFormat::Json
        );
        assert!(matches!(
            FileFormat::from_path(Path::new("/g/480/stats.bin")),
            Err(ParseError::UnsupportedFormat(ext)) if ext == ".bin"
        ));
        assert!(FileFormat::from_path(Path::new("/g/480/noext")).is_err());
    }

    #[test]
    fn test_credentials_are_redacted() {
        let creds = Credentials::new("SECRETKEY");
        assert_eq!(format!("{creds:?}"), "Credentials(***)");
        assert_eq!(creds.api_key(), "SECRETKEY");
        assert!(Credentials::from_key("   ").is_none());
        assert_eq!(Credentials::from_key(" k ").unwrap().api_key(), "k");
    }
}
