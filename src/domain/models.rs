// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Logical data domain; also the cache key and replay handler name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Flashcards,
    Sessions,
    Settings,
    LogicNodes,
}

impl StorageKey {
    pub const ALL: [StorageKey; 4] = [
        StorageKey::Flashcards,
        StorageKey::Sessions,
        StorageKey::Settings,
        StorageKey::LogicNodes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Flashcards => "flashcards",
            StorageKey::Sessions => "sessions",
            StorageKey::Settings => "settings",
            StorageKey::LogicNodes => "logic_nodes",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown storage key '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub deck_id: Option<String>,
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    #[serde(default)]
    pub interval_days: u32,
    #[serde(default)]
    pub repetitions: u32,
    /// Epoch millis of the next review, if scheduled
    #[serde(default)]
    pub due_at: Option<u64>,
    #[serde(default)]
    pub updated_at: u64,
}

fn default_ease_factor() -> f64 {
    2.5
}

impl Flashcard {
    pub fn new(id: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front: front.into(),
            back: back.into(),
            deck_id: None,
            ease_factor: default_ease_factor(),
            interval_days: 0,
            repetitions: 0,
            due_at: None,
            updated_at: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: String,
    pub started_at: u64,
    #[serde(default)]
    pub ended_at: Option<u64>,
    #[serde(default)]
    pub cards_reviewed: u32,
    #[serde(default)]
    pub correct_answers: u32,
}

impl StudySession {
    /// Session length in seconds, if it has ended.
    pub fn duration_secs(&self) -> Option<u64> {
        self.ended_at.map(|end| end.saturating_sub(self.started_at) / 1000)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub theme: String,
    pub daily_goal: u32,
    pub notifications_enabled: bool,
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            daily_goal: 20,
            notifications_enabled: true,
            language: "en".to_string(),
        }
    }
}

/// A node in the user's argument / concept map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Ids of nodes this one links to
    #[serde(default)]
    pub links: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_key_round_trip_names() {
        for key in StorageKey::ALL {
            assert_eq!(key.as_str().parse::<StorageKey>().unwrap(), key);
        }
        assert!("decks".parse::<StorageKey>().is_err());
        assert_eq!(StorageKey::LogicNodes.to_string(), "logic_nodes");
    }

    #[test]
    fn test_flashcard_defaults_missing_fields() {
        let card: Flashcard = serde_json::from_value(json!({
            "id": "c1",
            "front": "2 + 2",
            "back": "4"
        }))
        .unwrap();
        assert_eq!(card, Flashcard::new("c1", "2 + 2", "4"));
    }

    #[test]
    fn test_settings_partial_record() {
        let settings: UserSettings = serde_json::from_value(json!({"theme": "dark"})).unwrap();
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.daily_goal, 20);
    }

    #[test]
    fn test_session_duration() {
        let mut session = StudySession {
            id: "s1".into(),
            started_at: 10_000,
            ended_at: None,
            cards_reviewed: 0,
            correct_answers: 0,
        };
        assert_eq!(session.duration_secs(), None);
        session.ended_at = Some(70_000);
        assert_eq!(session.duration_secs(), Some(60));
    }
}
