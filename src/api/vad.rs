//! Voice-activity detection endpoints

use super::{AudioUpload, BackendClient};
use crate::error::PanelResult;
use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};

/// Optional tuning parameters for `POST /asr/vad/detect`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VadOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speech_duration_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speech_duration_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_silence_duration_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_pad_ms: Option<u32>,
}

impl VadOptions {
    /// Form fields for the parameters that are set, in a stable order
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(v) = self.threshold {
            fields.push(("threshold", v.to_string()));
        }
        if let Some(v) = self.min_speech_duration_ms {
            fields.push(("min_speech_duration_ms", v.to_string()));
        }
        if let Some(v) = self.max_speech_duration_s {
            fields.push(("max_speech_duration_s", v.to_string()));
        }
        if let Some(v) = self.min_silence_duration_ms {
            fields.push(("min_silence_duration_ms", v.to_string()));
        }
        if let Some(v) = self.speech_pad_ms {
            fields.push(("speech_pad_ms", v.to_string()));
        }
        fields
    }
}

#[async_trait]
pub trait VadApi: Send + Sync {
    async fn fetch_vad_status(&self) -> PanelResult<serde_json::Value>;

    async fn detect_vad_segments(
        &self,
        audio: &AudioUpload,
        options: &VadOptions,
    ) -> PanelResult<serde_json::Value>;

    async fn split_audio_by_vad(
        &self,
        audio: &AudioUpload,
        output_format: &str,
    ) -> PanelResult<serde_json::Value>;
}

#[async_trait]
impl VadApi for BackendClient {
    async fn fetch_vad_status(&self) -> PanelResult<serde_json::Value> {
        self.get_json("/asr/vad/health").await
    }

    async fn detect_vad_segments(
        &self,
        audio: &AudioUpload,
        options: &VadOptions,
    ) -> PanelResult<serde_json::Value> {
        let mut form = Form::new().part("file", audio.part());
        for (name, value) in options.form_fields() {
            form = form.text(name, value);
        }
        self.post_form("/asr/vad/detect", form).await
    }

    async fn split_audio_by_vad(
        &self,
        audio: &AudioUpload,
        output_format: &str,
    ) -> PanelResult<serde_json::Value> {
        let form = Form::new()
            .part("file", audio.part())
            .text("output_format", output_format.to_string());
        self.post_form("/asr/vad/split", form).await
    }
}
