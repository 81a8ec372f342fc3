//! Chat Conversation Engine
//!
//! Owns the conversation tree, sends turns to the LLM, and hands assistant
//! replies to the backend TTS store for (fire-and-forget) voicing. Every
//! synthesized clip becomes an [`AudioVersion`](types::AudioVersion) whose
//! handle lives in the engine's [`AudioRegistry`].
//!
//! When constructed with a [`ConversationsApi`], every structural change is
//! pushed to the backend first and server-assigned ids are adopted.

pub mod audio;
pub mod llm;
pub mod migration;
pub mod settings;
pub mod transfer;
pub mod types;

use crate::api::{ConversationUpdate, ConversationsApi};
use crate::error::{PanelError, PanelResult};
use crate::store::{read_lock, write_lock, BackendStore, StoreModule, Tracker};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use audio::AudioRegistry;
pub use llm::{ChatCompletion, LlmMessage, OpenAiClient};
pub use migration::migrate_audio_data;
pub use settings::{AiConfig, ChatSettings, FileSettings, SettingsSource, StaticSettings};
pub use transfer::ImportSummary;
pub use types::{derive_title, AudioVersion, Conversation, Message, Persona, Role};

struct ChatState {
    conversations: Vec<Conversation>,
    current_conversation_id: Option<String>,
    personas: Vec<Persona>,
    current_persona: Persona,
    auto_generate_audio: bool,
    /// Present once configuration has been loaded
    settings: Option<Arc<ChatSettings>>,
}

impl ChatState {
    fn conversation(&self, id: &str) -> PanelResult<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| conversation_not_found(id))
    }

    fn conversation_mut(&mut self, id: &str) -> PanelResult<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| conversation_not_found(id))
    }

    fn message_mut(&mut self, conversation_id: &str, message_id: &str) -> PanelResult<&mut Message> {
        self.conversation_mut(conversation_id)?
            .message_mut(message_id)
            .ok_or_else(|| message_not_found(message_id))
    }
}

fn conversation_not_found(id: &str) -> PanelError {
    PanelError::NotFound(format!("conversation {id}"))
}

fn message_not_found(id: &str) -> PanelError {
    PanelError::NotFound(format!("message {id}"))
}

struct Inner {
    backend: Arc<BackendStore>,
    llm: Arc<dyn ChatCompletion>,
    settings_source: Arc<dyn SettingsSource>,
    persistence: Option<Arc<dyn ConversationsApi>>,
    audio: AudioRegistry,
    state: RwLock<ChatState>,
    tracker: Tracker,
    /// Raised only while a turn is being sent or regenerated
    sending: Tracker,
    /// Audio synthesis keeps its own loading and error slot
    generating: Tracker,
    /// Serializes configuration loading
    init_lock: tokio::sync::Mutex<()>,
    pending_audio: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to the chat engine; clones share the same state
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<Inner>,
}

pub struct ChatStoreBuilder {
    backend: Arc<BackendStore>,
    llm: Arc<dyn ChatCompletion>,
    settings_source: Arc<dyn SettingsSource>,
    persistence: Option<Arc<dyn ConversationsApi>>,
    auto_generate_audio: bool,
}

impl ChatStoreBuilder {
    pub fn persistence(mut self, api: Arc<dyn ConversationsApi>) -> Self {
        self.persistence = Some(api);
        self
    }

    pub fn auto_generate_audio(mut self, enabled: bool) -> Self {
        self.auto_generate_audio = enabled;
        self
    }

    pub fn build(self) -> ChatStore {
        let defaults = ChatSettings::default();
        let current_persona = defaults.default_persona();
        let personas = defaults.personas;
        ChatStore {
            inner: Arc::new(Inner {
                backend: self.backend,
                llm: self.llm,
                settings_source: self.settings_source,
                persistence: self.persistence,
                audio: AudioRegistry::new(),
                state: RwLock::new(ChatState {
                    conversations: Vec::new(),
                    current_conversation_id: None,
                    personas,
                    current_persona,
                    auto_generate_audio: self.auto_generate_audio,
                    settings: None,
                }),
                tracker: Tracker::new(),
                sending: Tracker::new(),
                generating: Tracker::new(),
                init_lock: tokio::sync::Mutex::new(()),
                pending_audio: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl ChatStore {
    pub fn builder(
        backend: Arc<BackendStore>,
        llm: Arc<dyn ChatCompletion>,
        settings_source: Arc<dyn SettingsSource>,
    ) -> ChatStoreBuilder {
        ChatStoreBuilder {
            backend,
            llm,
            settings_source,
            persistence: None,
            auto_generate_audio: true,
        }
    }

    fn state(&self) -> std::sync::RwLockReadGuard<'_, ChatState> {
        read_lock(&self.inner.state)
    }

    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, ChatState> {
        write_lock(&self.inner.state)
    }

    // ---- getters ----

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state().conversations.clone()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.state().conversation(id).ok().cloned()
    }

    pub fn current_conversation_id(&self) -> Option<String> {
        self.state().current_conversation_id.clone()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        let state = self.state();
        let id = state.current_conversation_id.as_deref()?;
        state.conversation(id).ok().cloned()
    }

    /// Messages of the active conversation (empty when there is none)
    pub fn current_messages(&self) -> Vec<Message> {
        self.current_conversation()
            .map(|c| c.messages)
            .unwrap_or_default()
    }

    pub fn personas(&self) -> Vec<Persona> {
        self.state().personas.clone()
    }

    pub fn current_persona(&self) -> Persona {
        self.state().current_persona.clone()
    }

    pub fn auto_generate_audio(&self) -> bool {
        self.state().auto_generate_audio
    }

    pub fn settings(&self) -> Option<Arc<ChatSettings>> {
        self.state().settings.clone()
    }

    pub fn is_config_loaded(&self) -> bool {
        self.state().settings.is_some()
    }

    /// Whether conversations are stored on the backend
    pub fn is_persisted(&self) -> bool {
        self.inner.persistence.is_some()
    }

    pub fn is_sending(&self) -> bool {
        self.inner.sending.is_loading()
    }

    pub fn is_generating_audio(&self) -> bool {
        self.inner.generating.is_loading()
    }

    /// Last audio generation failure
    pub fn audio_error(&self) -> Option<String> {
        self.inner.generating.error()
    }

    pub fn audio(&self) -> &AudioRegistry {
        &self.inner.audio
    }

    // ---- configuration ----

    /// Load LLM settings and personas once; `force_reload` loads again
    /// even when already loaded.
    pub async fn initialize_config(&self, force_reload: bool) -> PanelResult<Arc<ChatSettings>> {
        self.inner
            .tracker
            .run("initialize_config", async {
                let _init = self.inner.init_lock.lock().await;
                if !force_reload {
                    if let Some(settings) = self.settings() {
                        return Ok(settings);
                    }
                }

                let settings = Arc::new(self.inner.settings_source.load().await?);
                {
                    let mut state = self.state_mut();
                    let keep = settings
                        .personas
                        .iter()
                        .find(|p| p.id == state.current_persona.id)
                        .cloned();
                    state.current_persona = keep.unwrap_or_else(|| settings.default_persona());
                    state.personas = settings.personas.clone();
                    migrate_audio_data(&mut state.conversations);
                    state.settings = Some(settings.clone());
                }
                info!(
                    "🧠 Chat config ready ({} personas, model {})",
                    settings.personas.len(),
                    settings.ai.model
                );
                Ok(settings)
            })
            .await
    }

    pub async fn reload_config(&self) -> PanelResult<Arc<ChatSettings>> {
        self.state_mut().settings = None;
        self.initialize_config(true).await
    }

    async fn ensure_config(&self) -> PanelResult<Arc<ChatSettings>> {
        self.initialize_config(false).await
    }

    pub fn toggle_auto_generate_audio(&self) -> bool {
        let mut state = self.state_mut();
        state.auto_generate_audio = !state.auto_generate_audio;
        state.auto_generate_audio
    }

    // ---- conversations ----

    /// Replace local conversations with the backend's, migrating legacy
    /// audio data
    pub async fn load_conversations(&self) -> PanelResult<usize> {
        self.inner
            .tracker
            .run("load_conversations", async {
                let api = self.inner.persistence.as_ref().ok_or_else(|| {
                    PanelError::Precondition("conversation persistence is disabled".into())
                })?;
                let mut conversations = api.list_conversations().await?;
                migrate_audio_data(&mut conversations);

                let count = conversations.len();
                let mut state = self.state_mut();
                let current_exists = state
                    .current_conversation_id
                    .as_deref()
                    .is_some_and(|id| conversations.iter().any(|c| c.id == id));
                if !current_exists {
                    state.current_conversation_id = conversations.first().map(|c| c.id.clone());
                }
                state.conversations = conversations;
                debug!("📚 Loaded {} conversations", count);
                Ok(count)
            })
            .await
    }

    /// Create a conversation at the head of the list and activate it
    pub async fn create_conversation(
        &self,
        title: Option<&str>,
        persona: Option<Persona>,
    ) -> PanelResult<Conversation> {
        self.inner
            .tracker
            .run("create_conversation", async {
                let (title, persona) = {
                    let state = self.state();
                    (
                        title.map(str::to_string).unwrap_or_else(|| {
                            format!("Conversation {}", state.conversations.len() + 1)
                        }),
                        persona.unwrap_or_else(|| state.current_persona.clone()),
                    )
                };

                let conversation = match &self.inner.persistence {
                    Some(api) => api.create_conversation(&title, &persona).await?,
                    None => Conversation::new(title, persona),
                };
                self.insert_active(conversation.clone());
                info!("💬 Created conversation {}", conversation.id);
                Ok(conversation)
            })
            .await
    }

    fn insert_active(&self, conversation: Conversation) {
        let mut state = self.state_mut();
        state.current_conversation_id = Some(conversation.id.clone());
        state.conversations.insert(0, conversation);
    }

    pub fn switch_conversation(&self, conversation_id: &str) -> PanelResult<()> {
        let mut state = self.state_mut();
        state.conversation(conversation_id)?;
        state.current_conversation_id = Some(conversation_id.to_string());
        Ok(())
    }

    /// Remove a conversation and release its audio. Deleting the active
    /// conversation activates the list head, or nothing when none remain.
    pub async fn delete_conversation(&self, conversation_id: &str) -> PanelResult<()> {
        self.inner
            .tracker
            .run("delete_conversation", async {
                self.state().conversation(conversation_id)?;
                if let Some(api) = &self.inner.persistence {
                    api.delete_conversation(conversation_id).await?;
                }

                let removed = {
                    let mut state = self.state_mut();
                    let index = state
                        .conversations
                        .iter()
                        .position(|c| c.id == conversation_id)
                        .ok_or_else(|| conversation_not_found(conversation_id))?;
                    let removed = state.conversations.remove(index);
                    if state.current_conversation_id.as_deref() == Some(conversation_id) {
                        state.current_conversation_id =
                            state.conversations.first().map(|c| c.id.clone());
                    }
                    removed
                };
                self.release_messages(removed.messages);
                info!("🗑️ Deleted conversation {}", conversation_id);
                Ok(())
            })
            .await
    }

    pub async fn delete_message(&self, conversation_id: &str, message_id: &str) -> PanelResult<()> {
        self.inner
            .tracker
            .run("delete_message", async {
                {
                    let state = self.state();
                    state
                        .conversation(conversation_id)?
                        .message(message_id)
                        .ok_or_else(|| message_not_found(message_id))?;
                }
                if let Some(api) = &self.inner.persistence {
                    api.delete_message(conversation_id, message_id).await?;
                }

                let removed = {
                    let mut state = self.state_mut();
                    let conversation = state.conversation_mut(conversation_id)?;
                    let index = conversation
                        .messages
                        .iter()
                        .position(|m| m.id == message_id)
                        .ok_or_else(|| message_not_found(message_id))?;
                    conversation.touch();
                    conversation.messages.remove(index)
                };
                self.release_messages(vec![removed]);
                Ok(())
            })
            .await
    }

    /// Keep messages `0..=message_index`, releasing the audio of the rest
    pub async fn rollback_to_message(
        &self,
        conversation_id: &str,
        message_index: usize,
    ) -> PanelResult<()> {
        self.inner
            .tracker
            .run("rollback_to_message", async {
                self.state().conversation(conversation_id)?;
                if let Some(api) = &self.inner.persistence {
                    api.rollback(conversation_id, message_index).await?;
                }

                let removed = {
                    let mut state = self.state_mut();
                    let conversation = state.conversation_mut(conversation_id)?;
                    let keep = (message_index + 1).min(conversation.messages.len());
                    let removed = conversation.messages.split_off(keep);
                    conversation.touch();
                    removed
                };
                debug!("⏪ Rolled back {} messages", removed.len());
                self.release_messages(removed);
                Ok(())
            })
            .await
    }

    /// Make `persona` current and apply it to the active conversation, then
    /// refresh the backend status (best effort).
    pub async fn set_persona(&self, persona: Persona) -> PanelResult<()> {
        self.inner
            .tracker
            .run("set_persona", async {
                let active = {
                    let mut state = self.state_mut();
                    state.current_persona = persona.clone();
                    let active = state.current_conversation_id.clone();
                    if let Some(id) = active.as_deref() {
                        let conversation = state.conversation_mut(id)?;
                        conversation.persona = persona.clone();
                        conversation.touch();
                    }
                    active
                };

                if let (Some(api), Some(id)) = (&self.inner.persistence, active.as_deref()) {
                    let update = ConversationUpdate {
                        persona: Some(persona.clone()),
                        ..Default::default()
                    };
                    api.update_conversation(id, &update).await?;
                }

                if let Err(e) = self.inner.backend.system().fetch_system_status().await {
                    warn!("⚠️ Status refresh after persona change failed: {}", e);
                }
                info!("🎭 Persona set to {}", persona.name);
                Ok(())
            })
            .await
    }

    pub async fn set_persona_by_name(&self, name: &str) -> PanelResult<()> {
        let persona = self
            .personas()
            .into_iter()
            .find(|p| p.name == name || p.id == name)
            .ok_or_else(|| PanelError::NotFound(format!("persona {name}")))?;
        self.set_persona(persona).await
    }

    // ---- messages ----

    /// Send a user turn and return the assistant reply.
    ///
    /// Targets `conversation_id`, else the active conversation, else a new
    /// one with the current persona. The user message is recorded before
    /// the LLM is called and stays in place if the call fails.
    pub async fn send_message(
        &self,
        content: &str,
        conversation_id: Option<&str>,
    ) -> PanelResult<Message> {
        self.inner
            .tracker
            .run("send_message", async {
                let _sending = self.inner.sending.begin();
                if content.trim().is_empty() {
                    return Err(PanelError::Validation("message must not be empty".into()));
                }
                let settings = self.ensure_config().await?;

                let target = match conversation_id {
                    Some(id) => Some(self.state().conversation(id)?.id.clone()),
                    None => {
                        let state = self.state();
                        state
                            .current_conversation_id
                            .as_deref()
                            .and_then(|id| state.conversation(id).ok())
                            .map(|c| c.id.clone())
                    }
                };
                let conversation_id = match target {
                    Some(id) => id,
                    None => self.create_conversation(None, None).await?.id,
                };

                self.append_message(&conversation_id, Role::User, content)
                    .await?;
                self.reply(&conversation_id, content, &settings).await
            })
            .await
    }

    /// Replace the assistant message at `message_index` with a fresh reply
    /// to the user message before it; later messages are dropped.
    pub async fn regenerate_response(
        &self,
        conversation_id: &str,
        message_index: usize,
    ) -> PanelResult<Message> {
        self.inner
            .tracker
            .run("regenerate_response", async {
                let _sending = self.inner.sending.begin();
                let user_content = {
                    let state = self.state();
                    let conversation = state.conversation(conversation_id)?;
                    let target = conversation.messages.get(message_index).ok_or_else(|| {
                        PanelError::NotFound(format!("message #{message_index}"))
                    })?;
                    if target.role != Role::Assistant {
                        return Err(PanelError::Precondition(
                            "only assistant messages can be regenerated".into(),
                        ));
                    }
                    message_index
                        .checked_sub(1)
                        .and_then(|i| conversation.messages.get(i))
                        .filter(|m| m.role == Role::User)
                        .map(|m| m.content.clone())
                        .ok_or_else(|| {
                            PanelError::Precondition(
                                "no user message precedes this reply".into(),
                            )
                        })?
                };

                let settings = self.ensure_config().await?;
                self.rollback_to_message(conversation_id, message_index - 1)
                    .await?;
                self.reply(conversation_id, &user_content, &settings).await
            })
            .await
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> PanelResult<Message> {
        let message = match &self.inner.persistence {
            Some(api) => api.add_message(conversation_id, role, content).await?,
            None => Message::new(role, content),
        };
        let mut state = self.state_mut();
        let conversation = state.conversation_mut(conversation_id)?;
        conversation.messages.push(message.clone());
        conversation.touch();
        Ok(message)
    }

    /// Ask the LLM to answer the conversation as it stands, record the
    /// reply, title a first exchange and queue the reply's audio.
    async fn reply(
        &self,
        conversation_id: &str,
        user_content: &str,
        settings: &ChatSettings,
    ) -> PanelResult<Message> {
        let request = {
            let state = self.state();
            let conversation = state.conversation(conversation_id)?;
            let mut request = Vec::with_capacity(conversation.messages.len() + 1);
            request.push(LlmMessage::new(Role::System, &conversation.persona.prompt));
            request.extend(
                conversation
                    .messages
                    .iter()
                    .map(|m| LlmMessage::new(m.role, &m.content)),
            );
            request
        };

        let reply = self.inner.llm.complete(&settings.ai, &request).await?;
        let assistant = self
            .append_message(conversation_id, Role::Assistant, &reply)
            .await?;

        let title = {
            let mut state = self.state_mut();
            let conversation = state.conversation_mut(conversation_id)?;
            (conversation.messages.len() == 2).then(|| {
                conversation.title = derive_title(user_content);
                conversation.title.clone()
            })
        };
        if let (Some(title), Some(api)) = (title, &self.inner.persistence) {
            let update = ConversationUpdate {
                title: Some(title),
                ..Default::default()
            };
            api.update_conversation(conversation_id, &update).await?;
        }

        if self.auto_generate_audio() {
            self.spawn_audio(conversation_id, &assistant.id)?;
        }
        Ok(assistant)
    }

    // ---- audio ----

    /// Queue audio generation without waiting for it. The message shows
    /// `audio_generating` until the task finishes.
    fn spawn_audio(&self, conversation_id: &str, message_id: &str) -> PanelResult<()> {
        self.state_mut()
            .message_mut(conversation_id, message_id)?
            .audio_generating = true;

        let store = self.clone();
        let (conversation_id, message_id) = (conversation_id.to_string(), message_id.to_string());
        let handle = tokio::spawn(async move {
            if let Err(e) = store
                .generate_message_audio(&conversation_id, &message_id, false)
                .await
            {
                warn!("❌ Audio for message {} failed: {}", message_id, e);
            }
        });
        let mut pending = self
            .inner
            .pending_audio
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        Ok(())
    }

    /// Audio tasks held until the next `wait_for_audio`
    pub fn pending_audio_tasks(&self) -> usize {
        self.inner
            .pending_audio
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait for every queued audio generation to finish
    pub async fn wait_for_audio(&self) {
        let handles = std::mem::take(
            &mut *self
                .inner
                .pending_audio
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        futures::future::join_all(handles).await;
    }

    /// Synthesize a message's text into a new audio version, which becomes
    /// the current one. Returns the new clip's handle.
    pub async fn generate_message_audio(
        &self,
        conversation_id: &str,
        message_id: &str,
        is_regenerate: bool,
    ) -> PanelResult<String> {
        self.inner
            .generating
            .run("generate_message_audio", async {
                let text = {
                    let mut state = self.state_mut();
                    let message = state.message_mut(conversation_id, message_id)?;
                    message.audio_generating = true;
                    message.content.clone()
                };
                debug!(
                    "🔊 {} audio for message {}",
                    if is_regenerate { "Regenerating" } else { "Generating" },
                    message_id
                );

                let result = self.inner.backend.tts().text_to_speech(&text).await;

                // The message may have been deleted while synthesizing
                let mut state = self.state_mut();
                match result {
                    Ok(bytes) => {
                        let conversation = state.conversation_mut(conversation_id)?;
                        let message = conversation
                            .message_mut(message_id)
                            .ok_or_else(|| message_not_found(message_id))?;
                        let handle = self.inner.audio.create(bytes);
                        message.push_audio_version(handle.clone());
                        message.audio_generating = false;
                        conversation.touch();
                        Ok(handle)
                    }
                    Err(e) => {
                        if let Ok(message) = state.message_mut(conversation_id, message_id) {
                            message.audio_generating = false;
                        }
                        Err(e)
                    }
                }
            })
            .await
    }

    /// Select a version; out-of-range indices are ignored (`Ok(false)`)
    pub async fn switch_audio_version(
        &self,
        conversation_id: &str,
        message_id: &str,
        version_index: usize,
    ) -> PanelResult<bool> {
        let switched = {
            let mut state = self.state_mut();
            let switched = state
                .message_mut(conversation_id, message_id)?
                .select_audio_version(version_index);
            if switched {
                state.conversation_mut(conversation_id)?.touch();
            }
            switched
        };

        if switched {
            if let Some(api) = &self.inner.persistence {
                if let Err(e) = api
                    .set_current_audio_version(conversation_id, message_id, version_index)
                    .await
                {
                    warn!("⚠️ Could not sync audio selection: {}", e);
                }
            }
        }
        Ok(switched)
    }

    /// Delete one audio version and release its clip
    pub async fn delete_audio_version(
        &self,
        conversation_id: &str,
        message_id: &str,
        version_index: usize,
    ) -> PanelResult<AudioVersion> {
        let removed = {
            let mut state = self.state_mut();
            let message = state.message_mut(conversation_id, message_id)?;
            let count = message.audio_versions.len();
            let removed = message.remove_audio_version(version_index).ok_or_else(|| {
                PanelError::Validation(format!(
                    "audio version {version_index} out of range ({count} versions)"
                ))
            })?;
            state.conversation_mut(conversation_id)?.touch();
            removed
        };
        self.inner.audio.revoke(&removed.url);

        if let Some(api) = &self.inner.persistence {
            if let Err(e) = api
                .delete_audio_version(conversation_id, message_id, &removed.id)
                .await
            {
                warn!("⚠️ Could not sync audio deletion: {}", e);
            }
        }
        Ok(removed)
    }

    /// Release every clip of one conversation (or all of them), clearing
    /// their version lists. Returns how many handles were released.
    pub fn cleanup_audio_resources(&self, conversation_id: Option<&str>) -> usize {
        let handles: Vec<String> = {
            let mut state = self.state_mut();
            state
                .conversations
                .iter_mut()
                .filter(|c| conversation_id.map_or(true, |id| c.id == id))
                .flat_map(|c| c.messages.iter_mut())
                .flat_map(Message::take_audio_handles)
                .collect()
        };
        for handle in &handles {
            self.inner.audio.revoke(handle);
        }
        handles.len()
    }

    fn release_messages(&self, messages: Vec<Message>) {
        for mut message in messages {
            for handle in message.take_audio_handles() {
                self.inner.audio.revoke(&handle);
            }
        }
    }

    /// Write the current clip of a message to `path`
    pub async fn save_message_audio(
        &self,
        conversation_id: &str,
        message_id: &str,
        path: &Path,
    ) -> PanelResult<()> {
        let handle = {
            let state = self.state();
            let message = state
                .conversation(conversation_id)?
                .message(message_id)
                .ok_or_else(|| message_not_found(message_id))?;
            message
                .current_audio()
                .map(|v| v.url.clone())
                .ok_or_else(|| PanelError::NotFound("message has no audio".into()))?
        };
        self.inner.audio.save(&handle, path).await
    }

    // ---- import / export ----

    /// File name and JSON document for a conversation export
    pub fn export_conversation(&self, conversation_id: &str) -> PanelResult<(String, String)> {
        let state = self.state();
        let conversation = state.conversation(conversation_id)?;
        Ok((
            transfer::export_file_name(&conversation.title, chrono::Utc::now()),
            transfer::export_json(conversation)?,
        ))
    }

    /// Write an export file into `dir`, returning its path
    pub async fn export_to_dir(&self, conversation_id: &str, dir: &Path) -> PanelResult<PathBuf> {
        let (file_name, json) = self.export_conversation(conversation_id)?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, json).await?;
        info!("📤 Exported conversation to {}", path.display());
        Ok(path)
    }

    /// Import one conversation document. Nothing changes unless the
    /// document is valid; the imported conversation is activated.
    pub async fn import_conversation(&self, file_name: &str, raw: &str) -> PanelResult<Conversation> {
        self.inner
            .tracker
            .run("import_conversation", async {
                let data = transfer::parse_import(file_name, raw)?;
                let persona = {
                    let state = self.state();
                    data.persona
                        .as_deref()
                        .and_then(|name| state.personas.iter().find(|p| p.name == name))
                        .cloned()
                        .unwrap_or_else(|| state.current_persona.clone())
                };
                let conversation = data.into_conversation(persona);

                let conversation = match &self.inner.persistence {
                    Some(api) => {
                        let mut created = api
                            .create_conversation(&conversation.title, &conversation.persona)
                            .await?;
                        for message in &conversation.messages {
                            created.messages.push(
                                api.add_message(&created.id, message.role, &message.content)
                                    .await?,
                            );
                        }
                        created
                    }
                    None => conversation,
                };

                self.insert_active(conversation.clone());
                info!("📥 Imported \"{}\"", conversation.title);
                Ok(conversation)
            })
            .await
    }

    pub async fn import_file(&self, path: &Path) -> PanelResult<Conversation> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let raw = tokio::fs::read_to_string(path).await?;
        self.import_conversation(&file_name, &raw).await
    }

    /// Import each file independently; failures are tallied, not fatal
    pub async fn import_files(&self, paths: &[PathBuf]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for path in paths {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let result = self.import_file(path).await;
            summary.record(&file_name, &result);
        }
        summary
    }
}

impl StoreModule for ChatStore {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }
}
