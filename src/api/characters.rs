//! Character (reference voice) endpoints

use super::{encode, BackendClient};
use crate::error::PanelResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub is_current: bool,
}

/// Response of `POST /characters/set`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCharacterAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub audio_path: Option<String>,
    /// Transcript of the reference audio picked for the character
    #[serde(default)]
    pub audio_text: Option<String>,
}

#[async_trait]
pub trait CharactersApi: Send + Sync {
    async fn fetch_characters(&self) -> PanelResult<Vec<Character>>;

    async fn set_character(&self, character_name: &str) -> PanelResult<SetCharacterAck>;
}

#[async_trait]
impl CharactersApi for BackendClient {
    async fn fetch_characters(&self) -> PanelResult<Vec<Character>> {
        self.get_json("/characters").await
    }

    async fn set_character(&self, character_name: &str) -> PanelResult<SetCharacterAck> {
        self.post_empty(&format!(
            "/characters/set?character_name={}",
            encode(character_name)
        ))
        .await
    }
}
