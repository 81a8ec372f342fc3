use super::BackendClient;
use crate::error::PanelResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot returned by `GET /status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub current_sovits_model: Option<String>,
    pub current_character: Option<String>,
    pub current_character_audio: Option<String>,
    pub device: Option<String>,
    pub version: Option<String>,
    pub model_version: Option<String>,
    pub temp_dir: Option<String>,
}

#[async_trait]
pub trait SystemApi: Send + Sync {
    async fn fetch_system_status(&self) -> PanelResult<SystemStatus>;
}

#[async_trait]
impl SystemApi for BackendClient {
    async fn fetch_system_status(&self) -> PanelResult<SystemStatus> {
        self.get_json("/status").await
    }
}
