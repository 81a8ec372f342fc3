//! Character (reference voice) selection state

use super::{read_lock, write_lock, StoreModule, Tracker};
use crate::api::{Character, CharactersApi, SetCharacterAck};
use crate::error::PanelResult;
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct CharactersState {
    pub characters: Vec<Character>,
    pub current_character: Option<String>,
    /// Transcript of the current character's reference audio
    pub current_character_text: Option<String>,
}

pub struct CharactersStore {
    api: Arc<dyn CharactersApi>,
    state: RwLock<CharactersState>,
    tracker: Tracker,
}

impl CharactersStore {
    pub fn new(api: Arc<dyn CharactersApi>) -> Self {
        Self {
            api,
            state: RwLock::new(CharactersState::default()),
            tracker: Tracker::new(),
        }
    }

    pub fn state(&self) -> CharactersState {
        read_lock(&self.state).clone()
    }

    pub fn characters(&self) -> Vec<Character> {
        read_lock(&self.state).characters.clone()
    }

    pub fn current_character(&self) -> Option<Character> {
        read_lock(&self.state)
            .characters
            .iter()
            .find(|c| c.is_current)
            .cloned()
    }

    /// Fetch the list; when nothing is current yet, select the first entry.
    pub async fn fetch_characters(&self) -> PanelResult<Vec<Character>> {
        self.tracker
            .run("fetch_characters", async {
                let characters = self.api.fetch_characters().await?;
                let first_unselected = {
                    let mut state = write_lock(&self.state);
                    state.current_character = characters
                        .iter()
                        .find(|c| c.is_current)
                        .map(|c| c.name.clone());
                    state.characters = characters.clone();
                    match state.current_character {
                        Some(_) => None,
                        None => characters.first().map(|c| c.name.clone()),
                    }
                };

                if let Some(name) = first_unselected {
                    info!("🎭 No current character, selecting {}", name);
                    self.set_character(&name).await?;
                    return Ok(self.characters());
                }
                Ok(characters)
            })
            .await
    }

    /// Switch the backend character, then flag it current locally
    /// (optimistic update, no re-fetch).
    pub async fn set_character(&self, character_name: &str) -> PanelResult<SetCharacterAck> {
        self.tracker
            .run("set_character", async {
                let ack = self.api.set_character(character_name).await?;
                let mut state = write_lock(&self.state);
                for character in state.characters.iter_mut() {
                    character.is_current = character.name == character_name;
                }
                state.current_character = Some(character_name.to_string());
                state.current_character_text = ack.audio_text.clone();
                info!("🎭 Character set to {}", character_name);
                Ok(ack)
            })
            .await
    }
}

impl StoreModule for CharactersStore {
    fn name(&self) -> &'static str {
        "characters"
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
