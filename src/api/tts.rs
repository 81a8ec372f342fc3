//! Text-to-speech endpoint

use super::BackendClient;
use crate::error::PanelResult;
use async_trait::async_trait;

#[async_trait]
pub trait TtsApi: Send + Sync {
    /// Synthesize `text` with the current model/character; returns the audio bytes
    async fn text_to_speech(&self, text: &str) -> PanelResult<Vec<u8>>;
}

#[async_trait]
impl TtsApi for BackendClient {
    async fn text_to_speech(&self, text: &str) -> PanelResult<Vec<u8>> {
        self.post_for_bytes("/tts", &serde_json::json!({ "text": text }))
            .await
    }
}
