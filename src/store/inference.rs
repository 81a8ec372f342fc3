use super::{read_lock, write_lock, StoreModule, Tracker};
use crate::api::{InferenceApi, InferenceConfig, InferenceConfigPatch};
use crate::error::PanelResult;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct InferenceState {
    /// Local defaults until the first fetch lands
    pub config: InferenceConfig,
}

pub struct InferenceStore {
    api: Arc<dyn InferenceApi>,
    state: RwLock<InferenceState>,
    tracker: Tracker,
}

impl InferenceStore {
    pub fn new(api: Arc<dyn InferenceApi>) -> Self {
        Self {
            api,
            state: RwLock::new(InferenceState::default()),
            tracker: Tracker::new(),
        }
    }

    pub fn config(&self) -> InferenceConfig {
        read_lock(&self.state).config.clone()
    }

    pub async fn fetch_inference_config(&self) -> PanelResult<InferenceConfig> {
        self.tracker
            .run("fetch_inference_config", async {
                let config = self.api.fetch_inference_config().await?;
                write_lock(&self.state).config = config.clone();
                Ok(config)
            })
            .await
    }

    /// Push a partial update; the backend answers with the full merged config
    pub async fn update_inference_config(
        &self,
        patch: &InferenceConfigPatch,
    ) -> PanelResult<InferenceConfig> {
        self.tracker
            .run("update_inference_config", async {
                let ack = self.api.update_inference_config(patch).await?;
                write_lock(&self.state).config = ack.config.clone();
                Ok(ack.config)
            })
            .await
    }
}

impl StoreModule for InferenceStore {
    fn name(&self) -> &'static str {
        "inference"
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
