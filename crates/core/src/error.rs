//! Error types for collaborator calls

use crate::snapshot::EntityId;
use thiserror::Error;

/// Errors produced while parsing an achievement file
#[derive(Error, Debug)]
pub enum ParseError {
    /// File extension is not a known achievement format
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Content could not be interpreted
    #[error("malformed content: {0}")]
    MalformedContent(String),
}

/// Errors produced by a metadata source
#[derive(Error, Debug)]
pub enum MetadataError {
    /// No API key is configured
    #[error("no Steam Web API key configured")]
    MissingCredentials,

    /// Nothing has been cached for the app yet
    #[error("no cached metadata for app {0}")]
    NotCached(EntityId),

    /// The app's metadata has no such achievement
    #[error("achievement '{achievement}' not found for app {entity}")]
    NotFound {
        entity: EntityId,
        achievement: String,
    },

    /// Request could not be completed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Remote answered with a non-success status
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// Response or cache file could not be decoded
    #[error("failed to decode metadata: {0}")]
    Decode(String),

    /// IO error on the local cache
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while showing a notification
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Helper program could not be started
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Helper program ran but reported failure
    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    /// No notification mechanism on this platform
    #[error("desktop notifications are not supported on this platform")]
    Unsupported,
}
