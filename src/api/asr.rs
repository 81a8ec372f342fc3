//! ASR (FunASR) endpoints
//!
//! Recognition uploads use two field-name contracts:
//! - normal mode: `POST /asr/recognize/file` with the audio in `audio_file`
//! - VAD mode: `POST /asr/recognize/vad` with the audio in `file` and
//!   `return_segments=true`

use super::{Ack, AudioUpload, BackendClient};
use crate::error::PanelResult;
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrModelInfo {
    pub model_name: String,
    pub is_loaded: bool,
    pub funasr_available: bool,
    pub vad_available: bool,
    pub vad_enabled: bool,
}

impl AsrModelInfo {
    /// Model loaded and the FunASR runtime present
    pub fn is_ready(&self) -> bool {
        self.is_loaded && self.funasr_available
    }
}

/// Which recognition endpoint to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognitionMode {
    #[default]
    Normal,
    Vad,
}

impl RecognitionMode {
    /// Endpoint path and the multipart field carrying the audio
    pub fn route(self) -> (&'static str, &'static str) {
        match self {
            RecognitionMode::Normal => ("/asr/recognize/file", "audio_file"),
            RecognitionMode::Vad => ("/asr/recognize/vad", "file"),
        }
    }

    /// Extra text fields sent alongside the audio
    pub fn extra_fields(self) -> &'static [(&'static str, &'static str)] {
        match self {
            RecognitionMode::Normal => &[],
            RecognitionMode::Vad => &[("return_segments", "true")],
        }
    }
}

impl std::fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionMode::Normal => write!(f, "normal"),
            RecognitionMode::Vad => write!(f, "vad"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionResult {
    pub success: bool,
    pub text: String,
    pub confidence: Option<f64>,
    pub segments: Option<Vec<serde_json::Value>>,
    pub error: Option<String>,
}

#[async_trait]
pub trait AsrApi: Send + Sync {
    async fn fetch_asr_model_info(&self) -> PanelResult<AsrModelInfo>;

    async fn fetch_asr_model_status(&self) -> PanelResult<serde_json::Value>;

    async fn fetch_asr_config(&self) -> PanelResult<serde_json::Value>;

    async fn load_asr_model(&self) -> PanelResult<Ack>;

    async fn unload_asr_model(&self) -> PanelResult<Ack>;

    async fn recognize(
        &self,
        audio: &AudioUpload,
        mode: RecognitionMode,
    ) -> PanelResult<RecognitionResult>;

    /// Copy (or move) downloaded models into the local model directory
    async fn migrate_asr_models(&self, copy_mode: bool) -> PanelResult<Ack>;

    async fn clean_asr_cache(&self) -> PanelResult<Ack>;

    async fn update_asr_config(&self, config: &serde_json::Value)
        -> PanelResult<serde_json::Value>;
}

#[async_trait]
impl AsrApi for BackendClient {
    async fn fetch_asr_model_info(&self) -> PanelResult<AsrModelInfo> {
        self.get_json("/asr/model/info").await
    }

    async fn fetch_asr_model_status(&self) -> PanelResult<serde_json::Value> {
        self.get_json("/asr/models/status").await
    }

    async fn fetch_asr_config(&self) -> PanelResult<serde_json::Value> {
        self.get_json("/asr/models/config").await
    }

    async fn load_asr_model(&self) -> PanelResult<Ack> {
        self.post_empty("/asr/model/load").await
    }

    async fn unload_asr_model(&self) -> PanelResult<Ack> {
        self.post_empty("/asr/model/unload").await
    }

    async fn recognize(
        &self,
        audio: &AudioUpload,
        mode: RecognitionMode,
    ) -> PanelResult<RecognitionResult> {
        let (endpoint, field) = mode.route();
        let mut form = Form::new().part(field, audio.part());
        for (name, value) in mode.extra_fields() {
            form = form.text(*name, *value);
        }
        self.post_form(endpoint, form).await
    }

    async fn migrate_asr_models(&self, copy_mode: bool) -> PanelResult<Ack> {
        self.post_empty(&format!("/asr/models/migrate?copy_mode={copy_mode}"))
            .await
    }

    async fn clean_asr_cache(&self) -> PanelResult<Ack> {
        self.post_empty("/asr/models/clean_cache").await
    }

    async fn update_asr_config(
        &self,
        config: &serde_json::Value,
    ) -> PanelResult<serde_json::Value> {
        self.post_json("/asr/config/update", config).await
    }
}
