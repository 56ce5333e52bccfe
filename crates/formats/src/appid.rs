//! App id extraction from file paths

use cheevo_core::{EntityId, EntityResolver};
use std::path::{Component, Path};

/// Uses the first all-digit path component as the Steam app id
///
/// `C:\Users\Public\Documents\Steam\CODEX\1245620\achievements.ini` → `1245620`
#[derive(Debug, Clone, Copy, Default)]
pub struct AppIdResolver;

impl AppIdResolver {
    pub fn new() -> Self {
        Self
    }
}

impl EntityResolver for AppIdResolver {
    fn resolve(&self, path: &Path) -> Option<EntityId> {
        path.components().find_map(|component| match component {
            Component::Normal(segment) => segment
                .to_str()
                .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
                .map(EntityId::new),
            _ => None,
        })
    }
}
