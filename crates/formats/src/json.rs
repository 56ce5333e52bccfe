//! JSON achievement files
//!
//! ```json
//! {
//!   "ACH_FIRST_BLOOD": { "achieved": true, "name": "First Blood" },
//!   "ACH_MARATHON": { "earned": false, "earned_time": 0 }
//! }
//! ```

use cheevo_core::{AchievementSnapshot, AchievementState, ParseError};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default, alias = "Achieved", alias = "earned")]
    achieved: bool,

    #[serde(default, alias = "Name", alias = "displayName")]
    name: Option<String>,
}

pub fn parse(content: &str) -> Result<AchievementSnapshot, ParseError> {
    let entries: BTreeMap<String, Entry> = serde_json::from_str(content)
        .map_err(|e| ParseError::MalformedContent(format!("invalid JSON: {e}")))?;

    Ok(entries
        .into_iter()
        .map(|(id, entry)| {
            let display_name = entry.name.unwrap_or_else(|| id.clone());
            let state = AchievementState {
                achieved: entry.achieved,
                display_name,
            };
            (id, state)
        })
        .collect())
}
