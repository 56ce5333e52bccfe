//! Steam achievement metadata for cheevo
//!
//! Achievement names, descriptions and icons come from the Steam Web API
//! and are cached per app under the cache directory:
//!
//! ```text
//! <cache>/<appid>/achievements.json   metadata, refreshed after 90 days
//! <cache>/<appid>/images/<icon>.jpg   icons, refreshed after 180 days
//! ```

pub mod api;
pub mod cache;

pub use api::{CachedAchievements, SteamAchievement};

use async_trait::async_trait;
use cache::Freshness;
use cheevo_core::{AchievementInfo, Credentials, EntityId, MetadataError, MetadataSource};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Endpoints and cache policy
#[derive(Debug, Clone)]
pub struct SteamOptions {
    /// Web API root (default: `https://api.steampowered.com`)
    pub api_base: String,
    /// Icon CDN root; icons resolve to `<cdn_base>/<appid>/<icon>`
    pub cdn_base: String,
    /// Language for localized names (default: `english`)
    pub language: String,
    /// Metadata older than this is fetched again (default: 90 days)
    pub metadata_max_age: Duration,
    /// Icons older than this are fetched again (default: 180 days)
    pub icon_max_age: Duration,
    /// Per-request timeout (default: 30s)
    pub timeout: Duration,
}

impl Default for SteamOptions {
    fn default() -> Self {
        Self {
            api_base: "https://api.steampowered.com".to_string(),
            cdn_base: "https://steamcdn-a.akamaihd.net/steamcommunity/public/images/apps"
                .to_string(),
            language: "english".to_string(),
            metadata_max_age: 90 * DAY,
            icon_max_age: 180 * DAY,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SteamOptions {
    /// Defaults with cache ages given in days
    pub fn with_max_ages(metadata_days: u64, icon_days: u64) -> Self {
        Self {
            metadata_max_age: Duration::from_secs(metadata_days * DAY.as_secs()),
            icon_max_age: Duration::from_secs(icon_days * DAY.as_secs()),
            ..Self::default()
        }
    }
}

/// Steam Web API backed [`MetadataSource`] with a file cache
#[derive(Debug, Clone)]
pub struct SteamMetadata {
    cache_dir: PathBuf,
    options: SteamOptions,
    client: reqwest::Client,
}

impl SteamMetadata {
    pub fn new(cache_dir: impl Into<PathBuf>, options: SteamOptions) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        Ok(Self {
            cache_dir: cache_dir.into(),
            options,
            client,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn options(&self) -> &SteamOptions {
        &self.options
    }

    /// `<cache>/<appid>/achievements.json`
    pub fn metadata_path(&self, entity: &EntityId) -> PathBuf {
        self.cache_dir.join(entity.as_str()).join("achievements.json")
    }

    /// `<cache>/<appid>/images/<basename of icon>`
    pub fn icon_cache_path(&self, entity: &EntityId, icon: &str) -> Option<PathBuf> {
        let name = icon.rsplit('/').next().filter(|name| !name.is_empty())?;
        Some(self.cache_dir.join(entity.as_str()).join("images").join(name))
    }

    /// Read the cached metadata for an app
    pub async fn cached(&self, entity: &EntityId) -> Result<CachedAchievements, MetadataError> {
        let path = self.metadata_path(entity);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MetadataError::NotCached(entity.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            MetadataError::Decode(format!("{}: {e}", path.display()))
        })
    }

    async fn fetch(
        &self,
        entity: &EntityId,
        credentials: &Credentials,
    ) -> Result<CachedAchievements, MetadataError> {
        let url = format!(
            "{}/IPlayerService/GetGameAchievements/v1/",
            self.options.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("language", self.options.language.as_str()),
                ("key", credentials.api_key()),
                ("appid", entity.as_str()),
            ])
            .send()
            .await
            // The URL carries the API key
            .map_err(|e| MetadataError::Http(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MetadataError::Http(e.without_url().to_string()))?;

        api::decode_response(entity.as_str(), &self.options.cdn_base, &body)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), MetadataError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataError::Status(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        cache::write_atomic(dest, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataSource for SteamMetadata {
    async fn ensure_cached(
        &self,
        entity: &EntityId,
        credentials: &Credentials,
    ) -> Result<(), MetadataError> {
        if credentials.api_key().trim().is_empty() {
            return Err(MetadataError::MissingCredentials);
        }

        let path = self.metadata_path(entity);
        match cache::freshness(&path, self.options.metadata_max_age).await? {
            Freshness::Fresh => {
                debug!(app = %entity, "Metadata cache is fresh");
                return Ok(());
            }
            Freshness::Stale => info!(app = %entity, "Metadata cache is stale, refreshing"),
            Freshness::Missing => info!(app = %entity, "Fetching achievement metadata"),
        }

        let cached = self.fetch(entity, credentials).await?;
        let json =
            serde_json::to_vec_pretty(&cached).map_err(|e| MetadataError::Decode(e.to_string()))?;
        cache::write_atomic(&path, &json).await?;

        info!(
            app = %entity,
            achievements = cached.achievements.len(),
            "Cached achievement metadata"
        );
        Ok(())
    }

    async fn lookup(
        &self,
        entity: &EntityId,
        achievement: &str,
    ) -> Result<AchievementInfo, MetadataError> {
        let cached = self.cached(entity).await?;

        cached
            .find(achievement)
            .map(SteamAchievement::to_info)
            .ok_or_else(|| MetadataError::NotFound {
                entity: entity.clone(),
                achievement: achievement.to_string(),
            })
    }

    async fn icon_path(&self, entity: &EntityId, icon: &str) -> Result<PathBuf, MetadataError> {
        let path = self
            .icon_cache_path(entity, icon)
            .ok_or_else(|| MetadataError::Decode(format!("icon reference has no file name: {icon}")))?;

        match cache::freshness(&path, self.options.icon_max_age).await? {
            Freshness::Fresh => return Ok(path),
            Freshness::Stale => debug!(app = %entity, icon, "Icon is stale, refreshing"),
            Freshness::Missing => debug!(app = %entity, icon, "Downloading icon"),
        }

        if let Err(e) = self.download(icon, &path).await {
            // A stale icon still beats none
            if path.exists() {
                warn!(app = %entity, error = %e, "Icon refresh failed, using stale copy");
                return Ok(path);
            }
            return Err(e);
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::time::SystemTime;
    use tempfile::TempDir;

    /// Nothing listens on the discard port, so requests fail fast
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn offline(cache_dir: &Path) -> anyhow::Result<SteamMetadata> {
        let options = SteamOptions {
            api_base: UNREACHABLE.to_string(),
            cdn_base: format!("{UNREACHABLE}/cdn"),
            timeout: Duration::from_secs(2),
            ..SteamOptions::default()
        };
        Ok(SteamMetadata::new(cache_dir, options)?)
    }

    fn write_cache(steam: &SteamMetadata, app: &EntityId) -> anyhow::Result<PathBuf> {
        let cached = api::decode_response(
            app.as_str(),
            &steam.options().cdn_base,
            br#"{"response": {"achievements": [
                {"internal_name": "ACH_WIN", "localized_name": "Winner",
                 "localized_desc": "Win.", "icon": "win.jpg", "icon_gray": "win_gray.jpg"}
            ]}}"#,
        )?;
        let path = steam.metadata_path(app);
        std::fs::create_dir_all(path.parent().expect("has parent"))?;
        std::fs::write(&path, serde_json::to_vec(&cached)?)?;
        Ok(path)
    }

    #[test]
    fn test_cache_layout() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let steam = offline(temp.path())?;
        let app = EntityId::from("480");

        assert_eq!(
            steam.metadata_path(&app),
            temp.path().join("480").join("achievements.json")
        );
        assert_eq!(
            steam.icon_cache_path(&app, "https://cdn/apps/480/abc.jpg"),
            Some(temp.path().join("480").join("images").join("abc.jpg"))
        );
        assert_eq!(steam.icon_cache_path(&app, "https://cdn/apps/480/"), None);
        Ok(())
    }

    #[test]
    fn test_default_ages() {
        let options = SteamOptions::default();
        assert_eq!(options.metadata_max_age, Duration::from_secs(90 * 86_400));
        assert_eq!(options.icon_max_age, Duration::from_secs(180 * 86_400));

        let custom = SteamOptions::with_max_ages(1, 2);
        assert_eq!(custom.metadata_max_age, Duration::from_secs(86_400));
        assert_eq!(custom.icon_max_age, Duration::from_secs(2 * 86_400));
    }

    #[tokio::test]
    async fn test_blank_key_is_rejected() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let steam = offline(temp.path())?;

        let result = steam
            .ensure_cached(&EntityId::from("480"), &Credentials::new("  "))
            .await;
        assert!(matches!(result, Err(MetadataError::MissingCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let steam = offline(temp.path())?;
        let app = EntityId::from("480");
        write_cache(&steam, &app)?;

        steam.ensure_cached(&app, &Credentials::new("KEY")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let steam = offline(temp.path())?;
        let app = EntityId::from("480");
        let path = write_cache(&steam, &app)?;

        let old = SystemTime::now() - Duration::from_secs(91 * 86_400);
        set_file_mtime(&path, FileTime::from_system_time(old))?;

        let result = steam.ensure_cached(&app, &Credentials::new("SECRET")).await;
        match result {
            Err(MetadataError::Http(message)) => assert!(!message.contains("SECRET")),
            other => panic!("expected HTTP failure, got {other:?}"),
        }

        // The stale cache is still served
        assert_eq!(steam.lookup(&app, "ACH_WIN").await?.display_name, "Winner");
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let steam = offline(temp.path())?;
        let app = EntityId::from("480");

        assert!(matches!(
            steam.lookup(&app, "ACH_WIN").await,
            Err(MetadataError::NotCached(_))
        ));

        write_cache(&steam, &app)?;
        let info = steam.lookup(&app, "ACH_WIN").await?;
        assert_eq!(info.display_name, "Winner");
        assert_eq!(info.description, "Win.");
        assert_eq!(
            info.icon.as_deref(),
            Some("http://127.0.0.1:9/cdn/480/win.jpg")
        );

        assert!(matches!(
            steam.lookup(&app, "ACH_MISSING").await,
            Err(MetadataError::NotFound { achievement, .. }) if achievement == "ACH_MISSING"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_decode_error() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let steam = offline(temp.path())?;
        let app = EntityId::from("480");

        let path = steam.metadata_path(&app);
        std::fs::create_dir_all(path.parent().expect("has parent"))?;
        std::fs::write(&path, "{ truncated")?;

        assert!(matches!(
            steam.lookup(&app, "ACH_WIN").await,
            Err(MetadataError::Decode(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_icon_path_prefers_cache() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let steam = offline(temp.path())?;
        let app = EntityId::from("480");
        let url = format!("{UNREACHABLE}/cdn/480/win.jpg");

        // Missing and unreachable
        assert!(steam.icon_path(&app, &url).await.is_err());

        let cached = steam.icon_cache_path(&app, &url).expect("has file name");
        std::fs::create_dir_all(cached.parent().expect("has parent"))?;
        std::fs::write(&cached, b"jpeg")?;
        assert_eq!(steam.icon_path(&app, &url).await?, cached);

        // Stale and unreachable falls back to the old copy
        let old = SystemTime::now() - Duration::from_secs(200 * 86_400);
        set_file_mtime(&cached, FileTime::from_system_time(old))?;
        assert_eq!(steam.icon_path(&app, &url).await?, cached);
        Ok(())
    }
}
