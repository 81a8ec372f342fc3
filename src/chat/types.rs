//! Conversation data model
//!
//! Field names follow the camelCase JSON shape shared with the backend's
//! conversation store and with exported files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Named system-prompt profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prompt: String,
}

impl Persona {
    pub fn new(id: &str, name: &str, description: &str, prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            prompt: prompt.to_string(),
        }
    }
}

/// One synthesized-audio artifact of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioVersion {
    pub id: String,
    /// Playable handle (a registry `blob:` handle or a backend URL)
    pub url: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "timestamp", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub audio_versions: Vec<AudioVersion>,
    /// Selected version; serialized as `-1` when nothing is selected
    #[serde(with = "audio_index", default)]
    pub current_audio_version: Option<usize>,
    #[serde(default)]
    pub audio_generating: bool,
    /// Single-URL audio shape written by older clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            audio_versions: Vec::new(),
            current_audio_version: None,
            audio_generating: false,
            audio_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub persona: Persona,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: impl Into<String>, persona: Persona) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title: title.into(),
            persona,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Title derived from the first user message: up to 20 characters, with an
/// ellipsis when the message is longer.
pub fn derive_title(first_message: &str) -> String {
    const MAX_TITLE_CHARS: usize = 20;

    if first_message.chars().count() > MAX_TITLE_CHARS {
        let head: String = first_message.chars().take(MAX_TITLE_CHARS).collect();
        format!("{head}...")
    } else {
        first_message.to_string()
    }
}

/// Timestamps are written as RFC 3339 and read either as RFC 3339 or as the
/// offset-less ISO form the backend emits for naive datetimes.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

/// `Option<usize>` on our side, `-1` or an index on the wire
pub(crate) mod audio_index {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(index) => serializer.serialize_i64(*index as i64),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<i64>::deserialize(deserializer)?;
        Ok(raw.and_then(|i| usize::try_from(i).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_title_is_kept() {
        assert_eq!(derive_title("hello"), "hello");
        assert_eq!(derive_title(&"a".repeat(20)), "a".repeat(20));
    }

    #[test]
    fn test_long_title_is_truncated() {
        let message = "abcdefghijklmnopqrstuvwxy";
        assert_eq!(message.len(), 25);
        assert_eq!(derive_title(message), "abcdefghijklmnopqrst...");
    }

    #[test]
    fn test_title_truncation_counts_characters() {
        let message = "你好".repeat(15);
        let title = derive_title(&message);
        assert_eq!(title.chars().count(), 23);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_audio_index_wire_format() {
        let mut message = Message::new(Role::Assistant, "hi");
        let json = serde_json::to_value(&message).expect("serialize");
        assert_eq!(json["currentAudioVersion"], -1);
        assert!(json.get("audioUrl").is_none());

        message.current_audio_version = Some(2);
        let json = serde_json::to_value(&message).expect("serialize");
        assert_eq!(json["currentAudioVersion"], 2);
    }

    #[test]
    fn test_backend_message_shape_parses() {
        let raw = r#"{
            "id": "1717000000000",
            "role": "assistant",
            "content": "你好",
            "timestamp": "2024-05-29T12:00:00.123456",
            "audioVersions": [],
            "currentAudioVersion": -1,
            "audioGenerating": false
        }"#;
        let message: Message = serde_json::from_str(raw).expect("parse");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.current_audio_version, None);
        assert_eq!(message.timestamp.to_rfc3339(), "2024-05-29T12:00:00.123456+00:00");
    }

    #[test]
    fn test_legacy_message_shape_parses() {
        let raw = r#"{
            "id": "m1",
            "role": "assistant",
            "content": "old",
            "timestamp": "2024-01-01T00:00:00Z",
            "audioUrl": "blob:legacy"
        }"#;
        let message: Message = serde_json::from_str(raw).expect("parse");
        assert!(message.audio_versions.is_empty());
        assert_eq!(message.audio_url.as_deref(), Some("blob:legacy"));
    }
}
