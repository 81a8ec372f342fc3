//! Inference configuration endpoints

use super::BackendClient;
use crate::error::PanelResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// TTS inference parameters as held by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub text_lang: String,
    pub prompt_lang: String,
    pub top_k: u32,
    pub top_p: f64,
    pub temperature: f64,
    pub text_split_method: String,
    pub batch_size: u32,
    pub speed_factor: f64,
    pub ref_text_free: bool,
    pub split_bucket: bool,
    pub fragment_interval: f64,
    pub parallel_infer: bool,
    pub repetition_penalty: f64,
    pub sample_steps: u32,
    pub super_sampling: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            text_lang: "中文".to_string(),
            prompt_lang: "中文".to_string(),
            top_k: 5,
            top_p: 1.0,
            temperature: 1.0,
            text_split_method: "凑四句一切".to_string(),
            batch_size: 20,
            speed_factor: 1.0,
            ref_text_free: false,
            split_bucket: true,
            fragment_interval: 0.3,
            parallel_infer: true,
            repetition_penalty: 1.35,
            sample_steps: 32,
            super_sampling: false,
        }
    }
}

/// Partial update; unset fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_split_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_text_free: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_bucket: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment_interval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_infer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_sampling: Option<bool>,
}

impl InferenceConfigPatch {
    /// Build a patch from `key=value` pairs, parsing values as JSON scalars
    /// where possible (`top_k=10`, `split_bucket=false`, `text_lang=英文`).
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> PanelResult<Self> {
        let mut object = serde_json::Map::new();
        for pair in pairs {
            let (key, raw) = pair.split_once('=').ok_or_else(|| {
                crate::error::PanelError::Validation(format!("expected key=value, got '{pair}'"))
            })?;
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            object.insert(key.trim().to_string(), value);
        }
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| crate::error::PanelError::Validation(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceUpdateAck {
    #[serde(default)]
    pub message: String,
    pub config: InferenceConfig,
}

#[async_trait]
pub trait InferenceApi: Send + Sync {
    async fn fetch_inference_config(&self) -> PanelResult<InferenceConfig>;

    async fn update_inference_config(
        &self,
        patch: &InferenceConfigPatch,
    ) -> PanelResult<InferenceUpdateAck>;
}

#[async_trait]
impl InferenceApi for BackendClient {
    async fn fetch_inference_config(&self) -> PanelResult<InferenceConfig> {
        self.get_json("/config/inference").await
    }

    async fn update_inference_config(
        &self,
        patch: &InferenceConfigPatch,
    ) -> PanelResult<InferenceUpdateAck> {
        self.post_json("/config/inference", patch).await
    }
}
