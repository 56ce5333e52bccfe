//! Steam Web API payloads
//!
//! `IPlayerService/GetGameAchievements/v1` answers with
//! `{"response": {"achievements": [...]}}` where icons are bare file names.
//! The cached form keeps the same entries with icons expanded to CDN URLs.

use cheevo_core::{AchievementInfo, MetadataError};
use serde::{Deserialize, Serialize};

/// One achievement as described by the Web API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteamAchievement {
    #[serde(rename = "internal_name")]
    pub api_name: String,

    #[serde(rename = "localized_name", default)]
    pub display_name: String,

    #[serde(rename = "localized_desc", default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon_gray: String,

    #[serde(default)]
    pub hidden: bool,

    /// Global unlock percentage, as the API formats it
    #[serde(
        rename = "player_percent_unlocked",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rarity: Option<String>,
}

impl SteamAchievement {
    pub fn to_info(&self) -> AchievementInfo {
        let display_name = if self.display_name.is_empty() {
            self.api_name.clone()
        } else {
            self.display_name.clone()
        };

        AchievementInfo {
            id: self.api_name.clone(),
            display_name,
            description: self.description.clone(),
            icon: (!self.icon.is_empty()).then(|| self.icon.clone()),
        }
    }
}

/// Contents of `<cache>/<appid>/achievements.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAchievements {
    pub appid: String,
    #[serde(default)]
    pub achievements: Vec<SteamAchievement>,
}

impl CachedAchievements {
    pub fn find(&self, api_name: &str) -> Option<&SteamAchievement> {
        self.achievements.iter().find(|a| a.api_name == api_name)
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    response: ApiResponse,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    achievements: Vec<SteamAchievement>,
}

/// Decode an API response body into the cached form, expanding icon names
pub fn decode_response(
    appid: &str,
    cdn_base: &str,
    body: &[u8],
) -> Result<CachedAchievements, MetadataError> {
    let envelope: ApiEnvelope =
        serde_json::from_slice(body).map_err(|e| MetadataError::Decode(e.to_string()))?;

    let achievements = envelope
        .response
        .achievements
        .into_iter()
        .map(|mut achievement| {
            achievement.icon = icon_url(cdn_base, appid, &achievement.icon);
            achievement.icon_gray = icon_url(cdn_base, appid, &achievement.icon_gray);
            achievement
        })
        .collect();

    Ok(CachedAchievements {
        appid: appid.to_string(),
        achievements,
    })
}

/// `<cdn>/<appid>/<icon>`; empty icons stay empty
fn icon_url(cdn_base: &str, appid: &str, icon: &str) -> String {
    if icon.is_empty() {
        return String::new();
    }
    format!("{}/{}/{}", cdn_base.trim_end_matches('/'), appid, icon)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CDN: &str = "https://steamcdn-a.akamaihd.net/steamcommunity/public/images/apps";

    const BODY: &str = r#"{
        "response": {
            "achievements": [
                {
                    "internal_name": "ACH_WIN_ONE_GAME",
                    "localized_name": "Winner",
                    "localized_desc": "Win one game.",
                    "icon": "abc123.jpg",
                    "icon_gray": "def456.jpg",
                    "hidden": false,
                    "player_percent_unlocked": "43.2"
                },
                {
                    "internal_name": "ACH_SECRET",
                    "localized_name": "",
                    "hidden": true
                }
            ]
        }
    }"#;

    #[test]
    fn test_decode_expands_icons() -> anyhow::Result<()> {
        let cached = decode_response("480", CDN, BODY.as_bytes())?;

        assert_eq!(cached.appid, "480");
        assert_eq!(cached.achievements.len(), 2);

        let win = cached.find("ACH_WIN_ONE_GAME").expect("missing achievement");
        assert_eq!(win.icon, format!("{CDN}/480/abc123.jpg"));
        assert_eq!(win.icon_gray, format!("{CDN}/480/def456.jpg"));
        assert_eq!(win.rarity.as_deref(), Some("43.2"));

        let secret = cached.find("ACH_SECRET").expect("missing achievement");
        assert!(secret.hidden);
        assert!(secret.icon.is_empty());
        Ok(())
    }

    #[test]
    fn test_to_info() -> anyhow::Result<()> {
        let cached = decode_response("480", CDN, BODY.as_bytes())?;

        let info = cached.find("ACH_WIN_ONE_GAME").map(SteamAchievement::to_info);
        assert_eq!(
            info,
            Some(AchievementInfo {
                id: "ACH_WIN_ONE_GAME".into(),
                display_name: "Winner".into(),
                description: "Win one game.".into(),
                icon: Some(format!("{CDN}/480/abc123.jpg")),
            })
        );

        // Falls back to the id when the API has no name
        let secret = cached.find("ACH_SECRET").map(SteamAchievement::to_info);
        assert_eq!(secret.map(|i| i.display_name).as_deref(), Some("ACH_SECRET"));
        Ok(())
    }

    #[test]
    fn test_empty_response_object() -> anyhow::Result<()> {
        let cached = decode_response("10", CDN, br#"{"response": {}}"#)?;
        assert!(cached.achievements.is_empty());
        Ok(())
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            decode_response("10", CDN, b"<html>rate limited</html>"),
            Err(MetadataError::Decode(_))
        ));
    }

    #[test]
    fn test_cache_round_trip_keeps_api_field_names() -> anyhow::Result<()> {
        let cached = decode_response("480", CDN, BODY.as_bytes())?;
        let json = serde_json::to_string(&cached)?;

        assert!(json.contains("\"internal_name\":\"ACH_WIN_ONE_GAME\""));
        assert_eq!(serde_json::from_str::<CachedAchievements>(&json)?, cached);
        Ok(())
    }
}
