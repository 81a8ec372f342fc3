//! Voice-activity detection state

use super::{read_lock, write_lock, StoreModule, Tracker};
use crate::api::{AudioUpload, VadApi, VadOptions};
use crate::error::PanelResult;
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct VadState {
    pub status: Option<serde_json::Value>,
    /// Options sent with every detection request
    pub config: VadOptions,
    pub last_segments: Option<serde_json::Value>,
    pub last_split: Option<serde_json::Value>,
}

pub struct VadStore {
    api: Arc<dyn VadApi>,
    state: RwLock<VadState>,
    tracker: Tracker,
}

impl VadStore {
    pub fn new(api: Arc<dyn VadApi>) -> Self {
        Self {
            api,
            state: RwLock::new(VadState::default()),
            tracker: Tracker::new(),
        }
    }

    pub fn state(&self) -> VadState {
        read_lock(&self.state).clone()
    }

    pub fn config(&self) -> VadOptions {
        read_lock(&self.state).config.clone()
    }

    pub async fn fetch_vad_status(&self) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("fetch_vad_status", async {
                let status = self.api.fetch_vad_status().await?;
                write_lock(&self.state).status = Some(status.clone());
                Ok(status)
            })
            .await
    }

    /// Detect speech segments using the locally configured options
    pub async fn detect_vad_segments(&self, audio: &AudioUpload) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("detect_vad_segments", async {
                let options = self.config();
                let segments = self.api.detect_vad_segments(audio, &options).await?;
                write_lock(&self.state).last_segments = Some(segments.clone());
                Ok(segments)
            })
            .await
    }

    pub async fn split_audio_by_vad(
        &self,
        audio: &AudioUpload,
        output_format: &str,
    ) -> PanelResult<serde_json::Value> {
        self.tracker
            .run("split_audio_by_vad", async {
                let split = self.api.split_audio_by_vad(audio, output_format).await?;
                write_lock(&self.state).last_split = Some(split.clone());
                Ok(split)
            })
            .await
    }

    /// Local only; the options travel with the next detection request
    pub fn update_vad_config(&self, options: VadOptions) {
        info!("🎚️ VAD options updated: {:?}", options);
        write_lock(&self.state).config = options;
    }
}

impl StoreModule for VadStore {
    fn name(&self) -> &'static str {
        "vad"
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
