//! Conversation import and export files
//!
//! Exported files carry text only:
//! `{title, persona, createdAt, messages: [{role, content, timestamp}]}`.

use super::types::{timestamp, Conversation, Message, Persona, Role};
use crate::error::{PanelError, PanelResult};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const IMPORTED_SUFFIX: &str = " (imported)";

lazy_static! {
    static ref UNSAFE_TITLE_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9]").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedConversation {
    pub title: String,
    /// Persona name
    pub persona: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub messages: Vec<ExportedMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedMessage {
    pub role: Role,
    pub content: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl From<&Conversation> for ExportedConversation {
    fn from(conversation: &Conversation) -> Self {
        Self {
            title: conversation.title.clone(),
            persona: conversation.persona.name.clone(),
            created_at: conversation.created_at,
            messages: conversation
                .messages
                .iter()
                .map(|m| ExportedMessage {
                    role: m.role,
                    content: m.content.clone(),
                    timestamp: m.timestamp,
                })
                .collect(),
        }
    }
}

/// Pretty-printed export document
pub fn export_json(conversation: &Conversation) -> PanelResult<String> {
    Ok(serde_json::to_string_pretty(&ExportedConversation::from(
        conversation,
    ))?)
}

/// `conversation_<title with non-alphanumerics as _>_<unix millis>.json`
pub fn export_file_name(title: &str, at: DateTime<Utc>) -> String {
    format!(
        "conversation_{}_{}.json",
        UNSAFE_TITLE_CHARS.replace_all(title, "_"),
        at.timestamp_millis()
    )
}

/// Validated contents of an import file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportData {
    pub title: String,
    pub persona: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub messages: Vec<ImportMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Check the file name and parse an import document
pub fn parse_import(file_name: &str, raw: &str) -> PanelResult<ImportData> {
    let is_json = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(PanelError::Validation(
            "please choose a valid JSON file".into(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| PanelError::Validation(format!("not valid JSON: {e}")))?;

    let title = value
        .get("title")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty());
    let messages = value.get("messages").filter(|m| m.is_array());
    let (Some(title), Some(messages)) = (title, messages) else {
        return Err(PanelError::Validation(
            "invalid conversation file format".into(),
        ));
    };

    let messages: Vec<ImportMessage> = serde_json::from_value(messages.clone())
        .map_err(|e| PanelError::Validation(format!("invalid message entry: {e}")))?;

    Ok(ImportData {
        title: title.to_string(),
        persona: value
            .get("persona")
            .and_then(|p| p.as_str())
            .map(str::to_string),
        created_at: value
            .get("createdAt")
            .and_then(|c| c.as_str())
            .and_then(timestamp::parse),
        messages,
    })
}

impl ImportData {
    /// Fresh conversation with new ids and no audio
    pub fn into_conversation(self, persona: Persona) -> Conversation {
        let now = Utc::now();
        let mut conversation = Conversation::new(format!("{}{IMPORTED_SUFFIX}", self.title), persona);
        conversation.created_at = self.created_at.unwrap_or(now);
        conversation.updated_at = now;
        conversation.messages = self
            .messages
            .into_iter()
            .map(|m| {
                let mut message = Message::new(m.role, m.content);
                message.timestamp = m
                    .timestamp
                    .as_deref()
                    .and_then(timestamp::parse)
                    .unwrap_or(now);
                message
            })
            .collect();
        conversation
    }
}

/// Outcome of a batch import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub success: usize,
    pub failed: usize,
    /// `"<file name>: <reason>"` per failed file
    pub errors: Vec<String>,
}

impl ImportSummary {
    pub fn record(&mut self, file_name: &str, result: &PanelResult<Conversation>) {
        match result {
            Ok(_) => self.success += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(format!("{}: {}", file_name, e.user_message()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::settings::default_personas;
    use chrono::TimeZone;

    #[test]
    fn test_export_shape() {
        let mut conversation = Conversation::new("Hi there", default_personas().remove(0));
        let mut message = Message::new(Role::Assistant, "hello");
        message.push_audio_version("blob:x".into());
        conversation.messages.push(message);

        let json: serde_json::Value =
            serde_json::from_str(&export_json(&conversation).expect("export")).expect("parse");
        assert_eq!(json["title"], "Hi there");
        assert_eq!(json["persona"], "Assistant");
        assert!(json["createdAt"].is_string());
        assert_eq!(json["messages"][0]["role"], "assistant");
        assert!(json["messages"][0].get("audioVersions").is_none());
    }

    #[test]
    fn test_export_file_name_is_sanitized() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(
            export_file_name("Hello, world!", at),
            "conversation_Hello__world__1700000000000.json"
        );
    }

    #[test]
    fn test_import_requires_json_file() {
        let err = parse_import("notes.txt", r#"{"title":"a","messages":[]}"#).unwrap_err();
        assert!(matches!(err, PanelError::Validation(_)));
    }

    #[test]
    fn test_import_requires_messages() {
        let err = parse_import("a.json", r#"{"title":"a"}"#).unwrap_err();
        assert!(matches!(err, PanelError::Validation(_)));
        assert!(parse_import("a.json", r#"{"title":"","messages":[]}"#).is_err());
        assert!(parse_import("a.json", r#"{"title":"a","messages":{}}"#).is_err());
    }

    #[test]
    fn test_import_builds_fresh_conversation() {
        let raw = r#"{
            "title": "Trip",
            "persona": "Assistant",
            "createdAt": "2024-03-01T10:00:00Z",
            "messages": [
                {"role": "user", "content": "hi", "timestamp": "2024-03-01T10:00:01Z"},
                {"role": "assistant", "content": "hello"}
            ]
        }"#;
        let data = parse_import("trip.JSON", raw).expect("parse");
        let conversation = data.into_conversation(default_personas().remove(0));

        assert_eq!(conversation.title, "Trip (imported)");
        assert_eq!(conversation.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(conversation.messages.len(), 2);
        assert_ne!(conversation.messages[0].id, conversation.messages[1].id);
        assert!(conversation
            .messages
            .iter()
            .all(|m| m.audio_versions.is_empty() && m.current_audio_version.is_none()));
    }

    #[test]
    fn test_summary_records_file_names() {
        let mut summary = ImportSummary::default();
        summary.record("a.json", &Ok(Conversation::new("a", default_personas().remove(0))));
        summary.record("b.json", &Err(PanelError::Validation("bad".into())));
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, vec!["b.json: Invalid input: bad".to_string()]);
    }
}
