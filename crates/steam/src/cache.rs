//! On-disk cache helpers

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Freshness of a cached file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Stale,
    Fresh,
}

/// Compare a file's modification time against `max_age`
///
/// A modification time in the future counts as fresh.
pub async fn freshness(path: &Path, max_age: Duration) -> io::Result<Freshness> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Freshness::Missing),
        Err(e) => return Err(e),
    };

    let modified = metadata.modified()?;
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);

    Ok(if age > max_age {
        Freshness::Stale
    } else {
        Freshness::Fresh
    })
}

/// Write `bytes` to `path` through a sibling temp file and a rename
///
/// Readers never observe a partially written file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, bytes).await?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
