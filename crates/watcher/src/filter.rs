//! Whitelist/ignore filtering of watched paths
//!
//! A pattern matches a path when either:
//! 1. the path's file name matches the pattern as a glob, or
//! 2. the raw pattern text occurs anywhere in the full path.
//!
//! So `achievements.ini` and `*.json` work as file-name patterns, while
//! `Steam/CODEX` or `tmp` work as path fragments.

use globset::{Glob, GlobMatcher};
use std::path::Path;
use tracing::debug;

/// A single whitelist or ignore pattern
#[derive(Debug, Clone)]
struct Pattern {
    raw: String,
    /// `None` if the pattern is not a valid glob; the substring rule still applies
    glob: Option<GlobMatcher>,
}

impl Pattern {
    fn new(raw: &str) -> Self {
        let glob = match Glob::new(raw) {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                debug!(pattern = raw, error = %e, "Pattern is not a valid glob, matching as substring only");
                None
            }
        };

        Self {
            raw: raw.to_string(),
            glob,
        }
    }

    fn matches(&self, path: &Path, path_str: &str) -> bool {
        let name_match = match (&self.glob, path.file_name()) {
            (Some(glob), Some(name)) => glob.is_match(Path::new(name)),
            _ => false,
        };

        name_match || path_str.contains(self.raw.as_str())
    }
}

/// Compiled whitelist/ignore rules
///
/// Pure and `Sync`; share one instance between threads.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    whitelist: Vec<Pattern>,
    ignore: Vec<Pattern>,
}

impl PathFilter {
    /// Compile a filter from pattern lists
    ///
    /// Blank patterns are skipped.
    pub fn new<W, I>(whitelist: W, ignore: I) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let compile = |raw: &str| (!raw.is_empty()).then(|| Pattern::new(raw));

        Self {
            whitelist: whitelist
                .into_iter()
                .filter_map(|p| compile(p.as_ref()))
                .collect(),
            ignore: ignore
                .into_iter()
                .filter_map(|p| compile(p.as_ref()))
                .collect(),
        }
    }

    /// Filter that includes everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Check if a path passes the filter
    ///
    /// A non-empty whitelist must match; ignore patterns then exclude
    /// unconditionally.
    pub fn should_include(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        if !self.whitelist.is_empty()
            && !self.whitelist.iter().any(|p| p.matches(path, &path_str))
        {
            return false;
        }

        !self.ignore.iter().any(|p| p.matches(path, &path_str))
    }

    pub fn whitelist_len(&self) -> usize {
        self.whitelist.len()
    }

    pub fn ignore_len(&self) -> usize {
        self.ignore.len()
    }
}

/// One-shot form of [`PathFilter::should_include`]
pub fn should_include(path: &Path, whitelist: &[String], ignore: &[String]) -> bool {
    PathFilter::new(whitelist, ignore).should_include(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_whitelist_by_file_name() {
        let whitelist = strings(&["achievements.ini"]);

        assert!(should_include(
            Path::new("/games/480/save/achievements.ini"),
            &whitelist,
            &[]
        ));
        assert!(!should_include(
            Path::new("/games/480/save/progress.dat"),
            &whitelist,
            &[]
        ));
    }

    #[test]
    fn test_ignore_by_fragment() {
        let ignore = strings(&["tmp"]);

        assert!(!should_include(Path::new("/games/tmp/x.ini"), &[], &ignore));
        assert!(should_include(Path::new("/games/x.ini"), &[], &ignore));
    }

    #[test]
    fn test_empty_rules_include_everything() {
        let filter = PathFilter::allow_all();
        assert!(filter.should_include(Path::new("/anything/at/all.bin")));
    }

    #[test]
    fn test_glob_matches_file_name_only() {
        let filter = PathFilter::new(["*.json"], Vec::<String>::new());

        assert!(filter.should_include(Path::new("/steam/480/stats/achievements.json")));
        assert!(!filter.should_include(Path::new("/steam/480.json/stats/achievements.ini")));
    }

    #[test]
    fn test_path_fragment_whitelist() {
        let filter = PathFilter::new(["Steam/CODEX"], Vec::<String>::new());

        assert!(filter.should_include(Path::new("/public/Steam/CODEX/480/achievements.ini")));
        assert!(!filter.should_include(Path::new("/public/OnlineFix/480/achievements.ini")));
    }

    #[test]
    fn test_ignore_wins_over_whitelist() {
        let filter = PathFilter::new(["achievements.ini"], ["backup"]);

        assert!(filter.should_include(Path::new("/g/480/achievements.ini")));
        assert!(!filter.should_include(Path::new("/g/backup/480/achievements.ini")));
    }

    #[test]
    fn test_file_name_glob_is_case_sensitive() {
        let filter = PathFilter::new(["achievements.ini"], Vec::<String>::new());

        assert!(!filter.should_include(Path::new("/g/480/Achievements.ini")));
    }

    #[test]
    fn test_invalid_glob_still_matches_as_substring() {
        let filter = PathFilter::new(["save[1"], Vec::<String>::new());

        assert_eq!(filter.whitelist_len(), 1);
        assert!(filter.should_include(Path::new("/g/save[1/achievements.ini")));
        assert!(!filter.should_include(Path::new("/g/save2/achievements.ini")));
    }

    #[test]
    fn test_blank_patterns_are_skipped() {
        let filter = PathFilter::new([""], [""]);

        assert_eq!(filter.whitelist_len(), 0);
        assert_eq!(filter.ignore_len(), 0);
        assert!(filter.should_include(Path::new("/g/file.txt")));
    }
}
