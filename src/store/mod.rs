//! Observable client-side state for each backend resource family
//!
//! Each sub-store owns its own state slice and a [`Tracker`] giving it the
//! uniform `loading`/`error` contract. [`BackendStore`] is the composition
//! root: it holds every sub-store by name and answers the cross-module
//! questions ("is anything loading", "what failed last").

pub mod asr;
pub mod characters;
pub mod inference;
pub mod models;
pub mod system;
pub mod tracker;
pub mod tts;
pub mod vad;

use crate::api::{
    AsrApi, BackendClient, CharactersApi, InferenceApi, ModelsApi, SystemApi, TtsApi, VadApi,
};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use asr::{AsrState, AsrStore, AudioInput};
pub use characters::{CharactersState, CharactersStore};
pub use inference::{InferenceState, InferenceStore};
pub use models::{ModelsState, ModelsStore};
pub use system::{SystemState, SystemStore};
pub use tracker::Tracker;
pub use tts::{TtsState, TtsStore};
pub use vad::{VadState, VadStore};

/// Common surface of every sub-store
pub trait StoreModule: Send + Sync {
    /// Unique module name, used as the key in [`BackendStore::errors`]
    fn name(&self) -> &'static str;

    fn tracker(&self) -> &Tracker;

    fn is_loading(&self) -> bool {
        self.tracker().is_loading()
    }

    fn error(&self) -> Option<String> {
        self.tracker().error()
    }

    fn clear_error(&self) {
        self.tracker().clear_error()
    }
}

/// Read a state slice; a poisoned lock still holds consistent data since
/// no guard is kept across an await.
pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// The unified backend store
pub struct BackendStore {
    models: ModelsStore,
    characters: CharactersStore,
    inference: InferenceStore,
    tts: TtsStore,
    system: SystemStore,
    asr: AsrStore,
    vad: VadStore,
}

impl BackendStore {
    /// Every sub-store talking to the same backend client
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self::with_apis(BackendApis::uniform(client))
    }

    pub fn with_apis(apis: BackendApis) -> Self {
        Self {
            models: ModelsStore::new(apis.models),
            characters: CharactersStore::new(apis.characters),
            inference: InferenceStore::new(apis.inference),
            tts: TtsStore::new(apis.tts),
            system: SystemStore::new(apis.system),
            asr: AsrStore::new(apis.asr),
            vad: VadStore::new(apis.vad),
        }
    }

    pub fn models(&self) -> &ModelsStore {
        &self.models
    }

    pub fn characters(&self) -> &CharactersStore {
        &self.characters
    }

    pub fn inference(&self) -> &InferenceStore {
        &self.inference
    }

    pub fn tts(&self) -> &TtsStore {
        &self.tts
    }

    pub fn system(&self) -> &SystemStore {
        &self.system
    }

    pub fn asr(&self) -> &AsrStore {
        &self.asr
    }

    pub fn vad(&self) -> &VadStore {
        &self.vad
    }

    pub fn modules(&self) -> [&dyn StoreModule; 7] {
        [
            &self.models,
            &self.characters,
            &self.inference,
            &self.tts,
            &self.system,
            &self.asr,
            &self.vad,
        ]
    }

    /// True while any sub-store has an action in flight
    pub fn is_loading(&self) -> bool {
        self.modules().iter().any(|m| m.is_loading())
    }

    /// `(module name, message)` for every sub-store holding an error
    pub fn errors(&self) -> Vec<(&'static str, String)> {
        self.modules()
            .iter()
            .filter_map(|m| m.error().map(|e| (m.name(), e)))
            .collect()
    }

    pub fn clear_errors(&self) {
        for module in self.modules() {
            module.clear_error();
        }
    }
}

/// Transport for each sub-store; tests plug a mock into every slot
#[derive(Clone)]
pub struct BackendApis {
    pub models: Arc<dyn ModelsApi>,
    pub characters: Arc<dyn CharactersApi>,
    pub inference: Arc<dyn InferenceApi>,
    pub tts: Arc<dyn TtsApi>,
    pub system: Arc<dyn SystemApi>,
    pub asr: Arc<dyn AsrApi>,
    pub vad: Arc<dyn VadApi>,
}

impl BackendApis {
    /// Same implementation behind every slot
    pub fn uniform<T>(api: Arc<T>) -> Self
    where
        T: ModelsApi + CharactersApi + InferenceApi + TtsApi + SystemApi + AsrApi + VadApi + 'static,
    {
        Self {
            models: api.clone(),
            characters: api.clone(),
            inference: api.clone(),
            tts: api.clone(),
            system: api.clone(),
            asr: api.clone(),
            vad: api,
        }
    }
}
