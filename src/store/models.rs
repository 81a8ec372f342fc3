//! SoVITS model selection state

use super::{read_lock, write_lock, StoreModule, Tracker};
use crate::api::{ModelsApi, SetModelAck, SovitsModel};
use crate::error::PanelResult;
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ModelsState {
    pub sovits_models: Vec<SovitsModel>,
    pub current_sovits_model: Option<String>,
}

pub struct ModelsStore {
    api: Arc<dyn ModelsApi>,
    state: RwLock<ModelsState>,
    tracker: Tracker,
}

impl ModelsStore {
    pub fn new(api: Arc<dyn ModelsApi>) -> Self {
        Self {
            api,
            state: RwLock::new(ModelsState::default()),
            tracker: Tracker::new(),
        }
    }

    pub fn state(&self) -> ModelsState {
        read_lock(&self.state).clone()
    }

    pub fn models(&self) -> Vec<SovitsModel> {
        read_lock(&self.state).sovits_models.clone()
    }

    /// First cached model flagged current
    pub fn current_model(&self) -> Option<SovitsModel> {
        read_lock(&self.state)
            .sovits_models
            .iter()
            .find(|m| m.is_current)
            .cloned()
    }

    pub async fn fetch_sovits_models(&self) -> PanelResult<Vec<SovitsModel>> {
        self.tracker
            .run("fetch_sovits_models", async {
                let models = self.api.fetch_sovits_models().await?;
                let mut state = write_lock(&self.state);
                state.current_sovits_model = models
                    .iter()
                    .find(|m| m.is_current)
                    .map(|m| m.name.clone());
                state.sovits_models = models.clone();
                Ok(models)
            })
            .await
    }

    /// Switch the backend model, then flag it current locally without
    /// waiting for a re-fetch (optimistic update).
    pub async fn set_sovits_model(&self, model_name: &str) -> PanelResult<SetModelAck> {
        self.tracker
            .run("set_sovits_model", async {
                let ack = self.api.set_sovits_model(model_name).await?;
                let mut state = write_lock(&self.state);
                for model in state.sovits_models.iter_mut() {
                    model.is_current = model.name == model_name;
                }
                state.current_sovits_model = Some(model_name.to_string());
                info!("🎛️ SoVITS model set to {}", model_name);
                Ok(ack)
            })
            .await
    }
}

impl StoreModule for ModelsStore {
    fn name(&self) -> &'static str {
        "models"
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
