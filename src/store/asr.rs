//! Speech recognition state and the quick-recognize policy
//!
//! Lifecycle actions re-fetch whatever they invalidate:
//! - load / unload / config update refresh the model info
//! - migration refreshes the model status and config
//! - cache cleanup refreshes the model status

use super::{read_lock, write_lock, StoreModule, Tracker};
use crate::api::{AsrApi, AsrModelInfo, AudioUpload, RecognitionMode, RecognitionResult};
use crate::error::{PanelError, PanelResult};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Audio handed to [`AsrStore::quick_recognize`]
#[derive(Debug, Clone, PartialEq)]
pub enum AudioInput {
    /// Audio file on disk
    File(PathBuf),
    /// In-memory recording
    Blob { bytes: Vec<u8>, file_name: String },
}

impl AudioInput {
    pub fn blob(bytes: Vec<u8>) -> Self {
        AudioInput::Blob {
            bytes,
            file_name: "recording.wav".to_string(),
        }
    }

    async fn into_upload(self) -> PanelResult<AudioUpload> {
        match self {
            AudioInput::File(path) => {
                if !path.is_file() {
                    return Err(PanelError::Validation(format!(
                        "audio file not found: {}",
                        path.display()
                    )));
                }
                AudioUpload::from_path(&path).await
            }
            AudioInput::Blob { bytes, file_name } => {
                if bytes.is_empty() {
                    return Err(PanelError::Validation("audio recording is empty".into()));
                }
                Ok(AudioUpload::new(file_name, bytes))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AsrState {
    pub model_info: Option<AsrModelInfo>,
    pub model_status: Option<serde_json::Value>,
    pub config: Option<serde_json::Value>,
    pub last_result: Option<RecognitionResult>,
}

pub struct AsrStore {
    api: Arc<dyn AsrApi>,
    state: RwLock<AsrState>,
    tracker: Tracker,
}

impl AsrStore {
    pub fn new(api: Arc<dyn AsrApi>) -> Self {
        Self {
            api,
            state: RwLock::new(AsrState::default()),
            tracker: Tracker::new(),
        }
    }

    pub fn state(&self) -> AsrState {
        read_lock(&self.state).clone()
    }

    pub fn model_info(&self) -> Option<AsrModelInfo> {
        read_lock(&self.state).model_info.clone()
    }

    fn info_flag(&self, flag: impl Fn(&AsrModelInfo) -> bool) -> bool {
        read_lock(&self.state).model_info.as_ref().is_some_and(flag)
    }

    pub fn is_asr_model_loaded(&self) -> bool {
        self.info_flag(|i| i.is_loaded)
    }

    pub fn is_funasr_available(&self) -> bool {
        self.info_flag(|i| i.funasr_available)
    }

    pub fn is_vad_available(&self) -> bool {
        self.info_flag(|i| i.vad_available)
    }

    pub fn is_vad_enabled(&self) -> bool {
        self.info_flag(|i| i.vad_enabled)
    }

    pub async fn fetch_asr_model_info(&self) -> PanelResult<AsrModelInfo> {
        self.tracker
            .run("fetch_asr_model_info", async {
                let info = self.api.fetch_asr_model_info().await?;
                write_lock(&self.state).model_info = Some(info.clone());
                Ok(info)
            })
            .await
    }

    pub async fn fetch_asr_model_status(&self) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("fetch_asr_model_status", async {
                let status = self.api.fetch_asr_model_status().await?;
                write_lock(&self.state).model_status = Some(status.clone());
                Ok(status)
            })
            .await
    }

    pub async fn fetch_asr_config(&self) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("fetch_asr_config", async {
                let config = self.api.fetch_asr_config().await?;
                write_lock(&self.state).config = Some(config.clone());
                Ok(config)
            })
            .await
    }

    pub async fn load_asr_model(&self) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("load_asr_model", async {
                let ack = self.api.load_asr_model().await?;
                info!("🎙️ ASR model loaded");
                self.fetch_asr_model_info().await?;
                Ok(ack)
            })
            .await
    }

    pub async fn unload_asr_model(&self) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("unload_asr_model", async {
                let ack = self.api.unload_asr_model().await?;
                info!("🎙️ ASR model unloaded");
                self.fetch_asr_model_info().await?;
                Ok(ack)
            })
            .await
    }

    pub async fn update_asr_config(
        &self,
        config: &serde_json::Value,
    ) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("update_asr_config", async {
                let updated = self.api.update_asr_config(config).await?;
                write_lock(&self.state).config = Some(updated.clone());
                self.fetch_asr_model_info().await?;
                Ok(updated)
            })
            .await
    }

    pub async fn migrate_asr_models(&self, copy_mode: bool) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("migrate_asr_models", async {
                let ack = self.api.migrate_asr_models(copy_mode).await?;
                self.fetch_asr_model_status().await?;
                self.fetch_asr_config().await?;
                Ok(ack)
            })
            .await
    }

    pub async fn clean_asr_cache(&self) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("clean_asr_cache", async {
                let ack = self.api.clean_asr_cache().await?;
                self.fetch_asr_model_status().await?;
                Ok(ack)
            })
            .await
    }

    pub async fn recognize(
        &self,
        audio: &AudioUpload,
        mode: RecognitionMode,
    ) -> PanelResult<RecognitionResult> {
        self.tracker
            .run("recognize", async {
                debug!("🎙️ Recognizing {} ({} mode)", audio.file_name, mode);
                let result = self.api.recognize(audio, mode).await?;
                write_lock(&self.state).last_result = Some(result.clone());
                Ok(result)
            })
            .await
    }

    /// Model loaded and FunASR available, judged from a fresh model-info
    /// fetch. A failed fetch counts as not ready.
    pub async fn check_asr_ready(&self) -> bool {
        match self.api.fetch_asr_model_info().await {
            Ok(info) => {
                let ready = info.is_ready();
                write_lock(&self.state).model_info = Some(info);
                ready
            }
            Err(e) => {
                warn!("⚠️ ASR readiness check failed: {}", e);
                false
            }
        }
    }

    /// Recognize with VAD assistance when the backend has VAD enabled and
    /// `use_vad` allows it, otherwise with plain recognition. Readiness is
    /// re-checked first; nothing is uploaded when the model is not ready.
    pub async fn quick_recognize(
        &self,
        input: AudioInput,
        use_vad: bool,
    ) -> PanelResult<RecognitionResult> {
        self.tracker
            .run("quick_recognize", async {
                let upload = input.into_upload().await?;

                if !self.check_asr_ready().await {
                    return Err(PanelError::NotReady(
                        "ASR model is not loaded or FunASR is unavailable; load the model first"
                            .into(),
                    ));
                }

                let mode = if use_vad && self.is_vad_enabled() {
                    RecognitionMode::Vad
                } else {
                    RecognitionMode::Normal
                };
                self.recognize(&upload, mode).await
            })
            .await
    }
}

impl StoreModule for AsrStore {
    fn name(&self) -> &'static str {
        "asr"
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
