use super::{read_lock, write_lock, StoreModule, Tracker};
use crate::api::{SystemApi, SystemStatus};
use crate::error::PanelResult;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct SystemState {
    pub status: Option<SystemStatus>,
}

pub struct SystemStore {
    api: Arc<dyn SystemApi>,
    state: RwLock<SystemState>,
    tracker: Tracker,
}

impl SystemStore {
    pub fn new(api: Arc<dyn SystemApi>) -> Self {
        Self {
            api,
            state: RwLock::new(SystemState::default()),
            tracker: Tracker::new(),
        }
    }

    pub fn status(&self) -> Option<SystemStatus> {
        read_lock(&self.state).status.clone()
    }

    pub async fn fetch_system_status(&self) -> PanelResult<SystemStatus> {
        self.tracker
            .run("fetch_system_status", async {
                let status = self.api.fetch_system_status().await?;
                write_lock(&self.state).status = Some(status.clone());
                Ok(status)
            })
            .await
    }
}

impl StoreModule for SystemStore {
    fn name(&self) -> &'static str {
        "system"
    }

    fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
