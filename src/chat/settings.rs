//! LLM endpoint and persona configuration
//!
//! Settings are read from an `ai-config.json` file shaped as
//! `{"AI_CONFIG": {...}, "DEFAULT_PERSONAS": [...]}`. Every field is
//! optional; anything missing falls back to the built-in defaults. A loaded
//! [`ChatSettings`] is an immutable snapshot: reloading produces a new one.

use super::types::Persona;
use crate::error::PanelResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chat-completion endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Sampling parameters merged into every completion request body
    pub default_params: Map<String, Value>,
    /// Request timeout in milliseconds
    pub timeout: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        let default_params = json!({
            "temperature": 0.7,
            "max_tokens": 1000,
            "top_p": 1,
            "frequency_penalty": 0,
            "presence_penalty": 0,
        });
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "your-openai-api-key".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            default_params: match default_params {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            timeout: 30_000,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// Built-in persona list (always non-empty)
pub fn default_personas() -> Vec<Persona> {
    vec![Persona::new(
        "assistant",
        "Assistant",
        "A friendly, professional AI assistant",
        "You are a friendly, professional and knowledgeable AI assistant. \
         Answer the user's questions clearly and helpfully. Stay polite and \
         patient, and say so honestly when you are not sure of an answer.",
    )]
}

/// One loaded configuration snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub ai: AiConfig,
    pub personas: Vec<Persona>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            ai: AiConfig::default(),
            personas: default_personas(),
        }
    }
}

#[derive(Deserialize)]
struct AiConfigFile {
    #[serde(rename = "AI_CONFIG")]
    ai_config: Option<AiConfig>,
    #[serde(rename = "DEFAULT_PERSONAS")]
    default_personas: Option<Vec<Persona>>,
}

impl ChatSettings {
    /// Parse an `ai-config.json` document over the defaults
    pub fn from_json(raw: &str) -> PanelResult<Self> {
        let file: AiConfigFile = serde_json::from_str(raw)?;
        let personas = match file.default_personas {
            Some(personas) if !personas.is_empty() => personas,
            _ => default_personas(),
        };
        Ok(Self {
            ai: file.ai_config.unwrap_or_default(),
            personas,
        })
    }

    /// First configured persona, or the built-in one
    pub fn default_persona(&self) -> Persona {
        self.personas
            .first()
            .cloned()
            .unwrap_or_else(|| default_personas().remove(0))
    }

    pub fn find_persona(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }
}

/// Where chat settings come from
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> PanelResult<ChatSettings>;
}

/// Settings read from an `ai-config.json` on disk
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SettingsSource for FileSettings {
    /// A missing or unreadable file yields the defaults
    async fn load(&self) -> PanelResult<ChatSettings> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No AI config at {}, using defaults", self.path.display());
                return Ok(ChatSettings::default());
            }
            Err(e) => {
                warn!("⚠️ Failed to read AI config {}: {}", self.path.display(), e);
                return Ok(ChatSettings::default());
            }
        };

        match ChatSettings::from_json(&raw) {
            Ok(settings) => {
                info!("🧠 AI config loaded: {}", settings.ai.base_url);
                Ok(settings)
            }
            Err(e) => {
                warn!("⚠️ Invalid AI config, using defaults: {}", e);
                Ok(ChatSettings::default())
            }
        }
    }
}

/// Fixed in-memory settings
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub ChatSettings);

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn load(&self) -> PanelResult<ChatSettings> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ai_config_keeps_defaults() {
        let settings = ChatSettings::from_json(
            r#"{"AI_CONFIG": {"baseURL": "http://llm.local/v1", "model": "qwen"}}"#,
        )
        .expect("parse");
        assert_eq!(settings.ai.base_url, "http://llm.local/v1");
        assert_eq!(settings.ai.model, "qwen");
        assert_eq!(settings.ai.timeout, 30_000);
        assert_eq!(settings.ai.default_params["max_tokens"], 1000);
        assert_eq!(settings.personas, default_personas());
    }

    #[test]
    fn test_personas_override() {
        let settings = ChatSettings::from_json(
            r#"{"DEFAULT_PERSONAS": [{"id": "cat", "name": "Cat", "prompt": "Meow."}]}"#,
        )
        .expect("parse");
        assert_eq!(settings.default_persona().id, "cat");
        assert!(settings.find_persona("Cat").is_some());
        assert!(settings.find_persona("Dog").is_none());
    }

    #[test]
    fn test_empty_persona_list_falls_back() {
        let settings = ChatSettings::from_json(r#"{"DEFAULT_PERSONAS": []}"#).expect("parse");
        assert_eq!(settings.default_persona().id, "assistant");
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = FileSettings::new(dir.path().join("ai-config.json"));
        assert_eq!(source.load().await.expect("load"), ChatSettings::default());
    }

    #[test]
    fn test_valid_file_is_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ai-config.json");
        std::fs::write(&path, r#"{"AI_CONFIG": {"apiKey": "sk-test"}}"#).expect("write");
        let settings = tokio_test::block_on(FileSettings::new(&path).load()).expect("load");
        assert_eq!(settings.ai.api_key, "sk-test");
        assert_eq!(settings.personas, default_personas());
    }

    #[tokio::test]
    async fn test_invalid_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ai-config.json");
        std::fs::write(&path, "{ not json").expect("write");
        let settings = FileSettings::new(&path).load().await.expect("load");
        assert_eq!(settings, ChatSettings::default());
    }
}
