//! Speech synthesis state

use super::{read_lock, write_lock, StoreModule, Tracker};
use crate::api::TtsApi;
use crate::error::{PanelError, PanelResult};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct TtsState {
    /// Size of the most recent synthesized clip
    pub last_audio_bytes: Option<usize>,
}

pub struct TtsStore {
    api: Arc<dyn TtsApi>,
    state: RwLock<TtsState>,
    tracker: Tracker,
}

impl TtsStore {
    pub fn new(api: Arc<dyn TtsApi>) -> Self {
        Self {
            api,
            state: RwLock::new(TtsState::default()),
            tracker: Tracker::new(),
        }
    }

    pub fn state(&self) -> TtsState {
        read_lock(&self.state).clone()
    }

    /// Synthesize `text`, returning the raw audio payload
    pub async fn text_to_speech(&self, text: &str) -> PanelResult<Vec<u8>> {
        self.tracker
            .run("text_to_speech", async {
                if text.trim().is_empty() {
                    return Err(PanelError::Validation("text must not be empty".into()));
                }
                let audio = self.api.text_to_speech(text).await?;
                debug!("🔊 Synthesized {} bytes", audio.len());
                write_lock(&self.state).last_audio_bytes = Some(audio.len());
                Ok(audio)
            })
            .await
    }
}

impl StoreModule for TtsStore {
    fn name(&self) -> &'static str {
        "tts"
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
