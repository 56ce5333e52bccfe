//! User settings
//!
//! Stored as TOML at `<config dir>/cheevo/config.toml`. Every field has a
//! default, so an empty or partial file is valid.

use anyhow::{Context, Result};
use cheevo_core::Credentials;
use cheevo_steam::SteamOptions;
use cheevo_watcher::WatcherOptions;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the settings file location
pub const CONFIG_ENV: &str = "CHEEVO_CONFIG";

/// Achievement file names written by the supported emulators
pub const DEFAULT_WHITELIST: [&str; 4] = [
    "achievements.ini",
    "achievements.json",
    "achiev.ini",
    "stats.ini",
];

/// Emulator save folders, relative to the environment variable they live under
const DEFAULT_FOLDERS: &[(&str, &str)] = &[
    ("PUBLIC", "Documents/Steam/CODEX"),
    ("PUBLIC", "Documents/Steam/RUNE"),
    ("PUBLIC", "Documents/OnlineFix"),
    ("PUBLIC", "Documents/Empress"),
    ("APPDATA", "Empress"),
    ("APPDATA", "Steam/CODEX"),
    ("APPDATA", "SmartSteamEmu"),
    ("APPDATA", "CreamAPI"),
    ("PROGRAMDATA", "Steam"),
    ("LOCALAPPDATA", "skidrow"),
];

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Steam Web API key; empty disables metadata fetching
    pub api_key: String,
    /// Root folders to watch
    pub folders: Vec<PathBuf>,
    pub watch: WatchSettings,
    pub notify: NotifySettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Quiet period before a burst of writes settles
    pub debounce_ms: u64,
    pub recursive: bool,
    pub whitelist: Vec<String>,
    pub ignore: Vec<String>,
    pub emit_removals: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// Larger simultaneous unlocks are treated as a bulk reset and dropped
    pub max_notify_achievements: usize,
    /// Minimum gap between metadata refreshes for one game
    pub refresh_cooldown_secs: u64,
    /// `false` logs notifications instead of showing them
    pub desktop: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Defaults to `<cache dir>/cheevo`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub metadata_max_age_days: u64,
    pub icon_max_age_days: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            folders: default_folders(),
            watch: WatchSettings::default(),
            notify: NotifySettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
            whitelist: DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
            ignore: Vec::new(),
            emit_removals: false,
        }
    }
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            max_notify_achievements: cheevo_core::DEFAULT_MAX_NOTIFY_ACHIEVEMENTS,
            refresh_cooldown_secs: cheevo_core::DEFAULT_REFRESH_COOLDOWN.as_secs(),
            desktop: true,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            metadata_max_age_days: 90,
            icon_max_age_days: 180,
        }
    }
}

/// Keys accepted by [`Settings::get`] and [`Settings::set`]
pub const KEYS: &[&str] = &[
    "api_key",
    "folders",
    "watch.debounce_ms",
    "watch.recursive",
    "watch.whitelist",
    "watch.ignore",
    "watch.emit_removals",
    "notify.max_notify_achievements",
    "notify.refresh_cooldown_secs",
    "notify.desktop",
    "cache.dir",
    "cache.metadata_max_age_days",
    "cache.icon_max_age_days",
];

impl Settings {
    /// Check every value against its allowed range
    pub fn validate(&self) -> Result<()> {
        if !(10..=10_000).contains(&self.watch.debounce_ms) {
            anyhow::bail!(
                "watch.debounce_ms must be between 10 and 10000 (got {})",
                self.watch.debounce_ms
            );
        }

        if !(1..=100).contains(&self.notify.max_notify_achievements) {
            anyhow::bail!(
                "notify.max_notify_achievements must be between 1 and 100 (got {})",
                self.notify.max_notify_achievements
            );
        }

        if self.notify.refresh_cooldown_secs > 3600 {
            anyhow::bail!(
                "notify.refresh_cooldown_secs must be at most 3600 (got {})",
                self.notify.refresh_cooldown_secs
            );
        }

        for (key, days) in [
            ("cache.metadata_max_age_days", self.cache.metadata_max_age_days),
            ("cache.icon_max_age_days", self.cache.icon_max_age_days),
        ] {
            if !(1..=3650).contains(&days) {
                anyhow::bail!("{key} must be between 1 and 3650 (got {days})");
            }
        }

        Ok(())
    }

    pub fn watcher_options(&self) -> WatcherOptions {
        WatcherOptions {
            debounce: Duration::from_millis(self.watch.debounce_ms),
            recursive: self.watch.recursive,
            whitelist: self.watch.whitelist.clone(),
            ignore: self.watch.ignore.clone(),
            emit_removals: self.watch.emit_removals,
        }
    }

    pub fn steam_options(&self) -> SteamOptions {
        SteamOptions::with_max_ages(
            self.cache.metadata_max_age_days,
            self.cache.icon_max_age_days,
        )
    }

    pub fn refresh_cooldown(&self) -> Duration {
        Duration::from_secs(self.notify.refresh_cooldown_secs)
    }

    /// `None` when no API key is configured
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_key(&self.api_key)
    }

    /// Metadata and icon cache directory
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::cache_dir()
                .map(|dir| dir.join("cheevo"))
                .context("Could not determine cache directory"),
        }
    }

    /// Read a value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "api_key" => self.api_key.clone(),
            "folders" => join_lines(self.folders.iter().map(|p| p.display().to_string())),
            "watch.debounce_ms" => self.watch.debounce_ms.to_string(),
            "watch.recursive" => self.watch.recursive.to_string(),
            "watch.whitelist" => self.watch.whitelist.join(","),
            "watch.ignore" => self.watch.ignore.join(","),
            "watch.emit_removals" => self.watch.emit_removals.to_string(),
            "notify.max_notify_achievements" => self.notify.max_notify_achievements.to_string(),
            "notify.refresh_cooldown_secs" => self.notify.refresh_cooldown_secs.to_string(),
            "notify.desktop" => self.notify.desktop.to_string(),
            "cache.dir" => self
                .cache
                .dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "cache.metadata_max_age_days" => self.cache.metadata_max_age_days.to_string(),
            "cache.icon_max_age_days" => self.cache.icon_max_age_days.to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'cheevo config list' to see available keys.",
                key
            ),
        };
        Ok(value)
    }

    /// Set a value by dotted key, then validate the result
    ///
    /// List values are comma separated. On error `self` is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();

        match key {
            "api_key" => next.api_key = value.trim().to_string(),
            "folders" => anyhow::bail!(
                "Use 'cheevo config add-folder' and 'cheevo config remove-folder' to edit folders"
            ),
            "watch.debounce_ms" => next.watch.debounce_ms = parse_int(value)?,
            "watch.recursive" => next.watch.recursive = parse_bool(value)?,
            "watch.whitelist" => next.watch.whitelist = split_list(value),
            "watch.ignore" => next.watch.ignore = split_list(value),
            "watch.emit_removals" => next.watch.emit_removals = parse_bool(value)?,
            "notify.max_notify_achievements" => {
                next.notify.max_notify_achievements = parse_int(value)?
            }
            "notify.refresh_cooldown_secs" => next.notify.refresh_cooldown_secs = parse_int(value)?,
            "notify.desktop" => next.notify.desktop = parse_bool(value)?,
            "cache.dir" => {
                let trimmed = value.trim();
                next.cache.dir = (!trimmed.is_empty()).then(|| PathBuf::from(trimmed));
            }
            "cache.metadata_max_age_days" => next.cache.metadata_max_age_days = parse_int(value)?,
            "cache.icon_max_age_days" => next.cache.icon_max_age_days = parse_int(value)?,
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'cheevo config list' to see available keys.",
                key
            ),
        }

        next.validate().context("Invalid configuration value")?;
        *self = next;
        Ok(())
    }

    /// Add a watch folder; returns `false` if it was already present
    pub fn add_folder(&mut self, folder: impl Into<PathBuf>) -> bool {
        let folder = folder.into();
        if self.folders.contains(&folder) {
            return false;
        }
        self.folders.push(folder);
        true
    }

    /// Remove a watch folder; returns `false` if it was not present
    pub fn remove_folder(&mut self, folder: &Path) -> bool {
        let before = self.folders.len();
        self.folders.retain(|f| f != folder);
        self.folders.len() != before
    }
}

fn parse_int<T: std::str::FromStr>(value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value '{}': must be a non-negative integer", value))
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value '{}': must be 'true' or 'false'", value))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_lines(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join("\n")
}

/// Emulator save folders under the current environment
pub fn default_folders() -> Vec<PathBuf> {
    default_folders_from(|name| std::env::var_os(name))
}

/// Emulator save folders, resolving variables through `lookup`
///
/// Folders under unset or empty variables are skipped.
pub fn default_folders_from(lookup: impl Fn(&str) -> Option<OsString>) -> Vec<PathBuf> {
    DEFAULT_FOLDERS
        .iter()
        .filter_map(|(var, rel)| {
            let base = lookup(var).filter(|v| !v.is_empty())?;
            Some(PathBuf::from(base).join(rel))
        })
        .collect()
}

/// Location of the settings file
pub fn config_file_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("cheevo").join("config.toml"))
        .context("Could not determine config directory")
}

/// Load settings, creating the file with defaults on first use
pub fn load() -> Result<Settings> {
    load_from(&config_file_path()?)
}

pub fn load_from(path: &Path) -> Result<Settings> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let settings: Settings = toml::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            settings
                .validate()
                .with_context(|| format!("Invalid settings in {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Loaded settings");
            Ok(settings)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let settings = Settings::default();
            save_to(&settings, path)?;
            tracing::info!(path = %path.display(), "Created default settings");
            Ok(settings)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

pub fn save(settings: &Settings) -> Result<()> {
    save_to(settings, &config_file_path()?)
}

pub fn save_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let text = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Commented example settings file
pub fn example_config() -> &'static str {
    r#"# cheevo settings

# Steam Web API key (https://steamcommunity.com/dev/apikey).
# Leave empty to show notifications without names or icons.
api_key = ""

# Folders to watch for achievement files
folders = [
    'C:\Users\Public\Documents\Steam\CODEX',
    'C:\Users\me\AppData\Roaming\Goldberg SteamEmu Saves',
]

[watch]
# Quiet period before a burst of writes is reported (10-10000)
debounce_ms = 100
# Also watch subdirectories, including ones created later
recursive = true
# File name globs (or path substrings) that are achievement files
whitelist = ["achievements.ini", "achievements.json", "achiev.ini", "stats.ini"]
# Globs or substrings that are never reported
ignore = []
emit_removals = false

[notify]
# More simultaneous unlocks than this are treated as a reset (1-100)
max_notify_achievements = 2
# Minimum seconds between metadata refreshes for one game (0-3600)
refresh_cooldown_secs = 5
# false logs notifications instead of showing them
desktop = true

[cache]
# dir = "/path/to/cache"
metadata_max_age_days = 90
icon_max_age_days = 180
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| OsString::from(v))
        }
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.api_key, "");
        assert_eq!(settings.watch, WatchSettings::default());
        assert_eq!(settings.notify.max_notify_achievements, 2);
        assert_eq!(settings.notify.refresh_cooldown_secs, 5);
        assert!(settings.notify.desktop);
        assert_eq!(settings.cache.metadata_max_age_days, 90);
        assert_eq!(settings.cache.icon_max_age_days, 180);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let text = r#"
            api_key = "ABC"
            folders = ["/games/codex"]
            [watch]
            debounce_ms = 250
        "#;
        let settings: Settings = toml::from_str(text).unwrap();
        assert_eq!(settings.api_key, "ABC");
        assert_eq!(settings.folders, vec![PathBuf::from("/games/codex")]);
        assert_eq!(settings.watch.debounce_ms, 250);
        // Untouched fields keep their defaults
        assert!(settings.watch.recursive);
        assert_eq!(settings.watch.whitelist.len(), 4);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(toml::from_str::<Settings>("this is not valid toml [[[").is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let settings: Settings = toml::from_str(example_config()).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.folders.len(), 2);
    }

    #[test]
    fn test_validate_ranges() {
        let mut settings = Settings::default();
        settings.watch.debounce_ms = 5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.notify.max_notify_achievements = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.cache.icon_max_age_days = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_get_and_set() {
        let mut settings = Settings::default();

        settings.set("watch.debounce_ms", "500").unwrap();
        settings.set("notify.desktop", "false").unwrap();
        settings.set("watch.ignore", "progress.dat, *.bak,").unwrap();
        settings.set("cache.dir", "/tmp/cheevo").unwrap();

        assert_eq!(settings.get("watch.debounce_ms").unwrap(), "500");
        assert_eq!(settings.get("notify.desktop").unwrap(), "false");
        assert_eq!(settings.get("watch.ignore").unwrap(), "progress.dat,*.bak");
        assert_eq!(settings.cache.dir, Some(PathBuf::from("/tmp/cheevo")));

        settings.set("cache.dir", "").unwrap();
        assert_eq!(settings.cache.dir, None);
    }

    #[test]
    fn test_set_rejects_bad_values_without_changing() {
        let mut settings = Settings::default();
        let before = settings.clone();

        assert!(settings.set("watch.debounce_ms", "fast").is_err());
        assert!(settings.set("watch.debounce_ms", "1").is_err());
        assert!(settings.set("notify.desktop", "yes").is_err());
        assert!(settings.set("folders", "/x").is_err());
        assert!(settings.set("nope", "1").is_err());
        assert_eq!(settings, before);
    }

    #[test]
    fn test_every_key_is_readable() {
        let settings = Settings::default();
        for key in KEYS {
            assert!(settings.get(key).is_ok(), "unreadable key {key}");
        }
    }

    #[test]
    fn test_add_and_remove_folder() {
        let mut settings = Settings {
            folders: Vec::new(),
            ..Settings::default()
        };

        assert!(settings.add_folder("/games/a"));
        assert!(!settings.add_folder("/games/a"));
        assert!(settings.add_folder("/games/b"));
        assert_eq!(settings.folders.len(), 2);

        assert!(settings.remove_folder(Path::new("/games/a")));
        assert!(!settings.remove_folder(Path::new("/games/a")));
        assert_eq!(settings.folders, vec![PathBuf::from("/games/b")]);
    }

    #[test]
    fn test_default_folders_skip_unset_variables() {
        let folders = default_folders_from(env(&[("PUBLIC", "/pub"), ("LOCALAPPDATA", "")]));
        assert_eq!(
            folders,
            vec![
                PathBuf::from("/pub/Documents/Steam/CODEX"),
                PathBuf::from("/pub/Documents/Steam/RUNE"),
                PathBuf::from("/pub/Documents/OnlineFix"),
                PathBuf::from("/pub/Documents/Empress"),
            ]
        );

        assert!(default_folders_from(env(&[])).is_empty());
        assert_eq!(
            default_folders_from(env(&[("PROGRAMDATA", "/pd")])),
            vec![PathBuf::from("/pd/Steam")]
        );
    }

    #[test]
    fn test_load_creates_defaults_and_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let created = load_from(&path).unwrap();
        assert!(path.exists());

        let mut edited = created.clone();
        edited.api_key = "KEY".into();
        edited.add_folder("/games/codex");
        save_to(&edited, &path).unwrap();

        assert_eq!(load_from(&path).unwrap(), edited);
    }

    #[test]
    fn test_load_rejects_out_of_range_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[notify]\nmax_notify_achievements = 0\n").unwrap();

        assert!(load_from(&path).is_err());
    }

    #[test]
    fn test_credentials() {
        let mut settings = Settings::default();
        assert!(settings.credentials().is_none());
        settings.api_key = "  ".into();
        assert!(settings.credentials().is_none());
        settings.api_key = "KEY".into();
        assert_eq!(settings.credentials().map(|c| c.api_key().to_string()).as_deref(), Some("KEY"));
    }
}
