#![allow(dead_code)]

pub mod mock_backend;
pub mod mock_llm;

use mock_backend::MockBackend;
use mock_llm::{CountingSettings, MockLlm};
use sovits_panel::chat::{ChatSettings, ChatStore, Persona};
use sovits_panel::store::{BackendApis, BackendStore};
use std::sync::Arc;

pub struct TestContext {
    pub backend: Arc<MockBackend>,
    pub store: Arc<BackendStore>,
    pub llm: Arc<MockLlm>,
    pub settings: Arc<CountingSettings>,
    pub chat: ChatStore,
}

impl TestContext {
    /// In-memory chat; audio is only generated when asked for
    pub fn new() -> Self {
        Self::build(false, false)
    }

    pub fn with_auto_audio() -> Self {
        Self::build(true, false)
    }

    /// Chat that pushes every change to the mock backend
    pub fn persisted() -> Self {
        Self::build(false, true)
    }

    fn build(auto_audio: bool, persisted: bool) -> Self {
        let backend = Arc::new(MockBackend::new());
        let store = Arc::new(BackendStore::with_apis(BackendApis::uniform(backend.clone())));
        let llm = Arc::new(MockLlm::new());
        let settings = Arc::new(CountingSettings::new(test_settings()));

        let builder = ChatStore::builder(store.clone(), llm.clone(), settings.clone())
            .auto_generate_audio(auto_audio);
        let chat = if persisted {
            builder.persistence(backend.clone()).build()
        } else {
            builder.build()
        };

        Self {
            backend,
            store,
            llm,
            settings,
            chat,
        }
    }
}

pub fn test_settings() -> ChatSettings {
    ChatSettings {
        personas: vec![
            Persona::new("assistant", "Assistant", "helpful", "You are helpful."),
            Persona::new("pirate", "Pirate", "arr", "You talk like a pirate."),
        ],
        ..ChatSettings::default()
    }
}
