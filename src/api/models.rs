//! SoVITS model endpoints

use super::{encode, BackendClient};
use crate::error::PanelResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SovitsModel {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetModelAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub model: String,
}

#[async_trait]
pub trait ModelsApi: Send + Sync {
    async fn fetch_sovits_models(&self) -> PanelResult<Vec<SovitsModel>>;

    async fn set_sovits_model(&self, model_name: &str) -> PanelResult<SetModelAck>;
}

#[async_trait]
impl ModelsApi for BackendClient {
    async fn fetch_sovits_models(&self) -> PanelResult<Vec<SovitsModel>> {
        self.get_json("/models/sovits").await
    }

    async fn set_sovits_model(&self, model_name: &str) -> PanelResult<SetModelAck> {
        self.post_empty(&format!(
            "/models/sovits/set?model_name={}",
            encode(model_name)
        ))
        .await
    }
}
