//! INI achievement files
//!
//! ```ini
//! [SteamAchievements]
//! Count=2
//!
//! [ACH_FIRST_BLOOD]
//! Achieved=1
//! UnlockTime=1700000000
//!
//! [ACH_MARATHON]
//! Achieved=0
//! ```
//!
//! Every named section is an achievement except the `SteamAchievements`
//! summary section. The flag key differs between tools, so several names
//! are accepted.

use cheevo_core::{AchievementSnapshot, AchievementState, ParseError};
use ::ini::{Ini, ParseOption};

/// Keys (lower-cased) that carry the unlock flag
const FLAG_KEYS: &[&str] = &["achieved", "state", "haveachieved", "unlocked", "earned"];

/// Summary section written by some tools; not an achievement
const SUMMARY_SECTION: &str = "steamachievements";

pub fn parse(content: &str) -> Result<AchievementSnapshot, ParseError> {
    // Values like `Description="a \ b"` must come through verbatim
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };

    let document = Ini::load_from_str_opt(content, options)
        .map_err(|e| ParseError::MalformedContent(e.to_string()))?;

    let mut snapshot = AchievementSnapshot::new();

    for (section, properties) in document.iter() {
        let Some(id) = section.filter(|name| is_achievement_section(name)) else {
            continue;
        };

        let mut achieved = false;
        for (key, value) in properties.iter() {
            if FLAG_KEYS.contains(&key.trim().to_ascii_lowercase().as_str()) {
                achieved = parse_flag(value.trim()).ok_or_else(|| {
                    ParseError::MalformedContent(format!(
                        "invalid boolean '{value}' for '{key}' in section [{id}]"
                    ))
                })?;
            }
        }

        let state = if achieved {
            AchievementState::unlocked(id)
        } else {
            AchievementState::locked(id)
        };
        snapshot.insert(id, state);
    }

    Ok(snapshot)
}

fn is_achievement_section(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && !name.eq_ignore_ascii_case(SUMMARY_SECTION)
}

/// The boolean spellings the achievement tools emit
fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODEX: &str = "\
[SteamAchievements]
Count=3

[ACH_FIRST_BLOOD]
Achieved=1
CurProgress=0
MaxProgress=0
UnlockTime=1700000000

[ACH_MARATHON]
Achieved=0

[ACH_NO_FLAG]
UnlockTime=0
";

    #[test]
    fn test_parses_sections() -> anyhow::Result<()> {
        let snapshot = parse(CODEX)?;

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.is_unlocked("ACH_FIRST_BLOOD"));
        assert!(!snapshot.is_unlocked("ACH_MARATHON"));
        assert!(snapshot.contains("ACH_NO_FLAG"));
        assert!(!snapshot.is_unlocked("ACH_NO_FLAG"));
        assert!(!snapshot.contains("SteamAchievements"));
        assert_eq!(
            snapshot.get("ACH_FIRST_BLOOD").map(|s| s.display_name.as_str()),
            Some("ACH_FIRST_BLOOD")
        );
        Ok(())
    }

    #[test]
    fn test_alternate_flag_keys() -> anyhow::Result<()> {
        let snapshot = parse(
            "[A]\nState=1\n[B]\nHaveAchieved=true\n[C]\nunlocked=T\n[D]\nEARNED=False\n",
        )?;

        assert!(snapshot.is_unlocked("A"));
        assert!(snapshot.is_unlocked("B"));
        assert!(snapshot.is_unlocked("C"));
        assert!(!snapshot.is_unlocked("D"));
        Ok(())
    }

    #[test]
    fn test_summary_section_is_case_insensitive() -> anyhow::Result<()> {
        let snapshot = parse("[steamachievements]\nCount=1\n[STEAMACHIEVEMENTS]\n[A]\nAchieved=1\n")?;

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("A"));
        Ok(())
    }

    #[test]
    fn test_invalid_flag_is_malformed() {
        let result = parse("[A]\nAchieved=yes\n");
        assert!(matches!(result, Err(ParseError::MalformedContent(msg)) if msg.contains("yes")));
    }

    #[test]
    fn test_values_are_not_unescaped() -> anyhow::Result<()> {
        let snapshot = parse("[A]\nAchieved=1\nDescription=\"C:\\Games\\x\"\n")?;
        assert!(snapshot.is_unlocked("A"));
        Ok(())
    }

    #[test]
    fn test_empty_file() -> anyhow::Result<()> {
        assert!(parse("")?.is_empty());
        assert!(parse("Count=3\n")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_flag_spellings() {
        for yes in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_flag(yes), Some(true), "{yes}");
        }
        for no in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_flag(no), Some(false), "{no}");
        }
        for bad in ["", "yes", "tRUE", "2"] {
            assert_eq!(parse_flag(bad), None, "{bad}");
        }
    }
}
