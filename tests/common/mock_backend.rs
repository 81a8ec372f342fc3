//! Mock Backend for Testing
//!
//! Implements every resource trait in memory and records each call as a
//! short string (`"set_sovits_model:b"`, `"recognize:vad:clip.wav"`, ...).

use async_trait::async_trait;
use sovits_panel::api::{
    Ack, AsrApi, AsrModelInfo, AudioUpload, Character, CharactersApi, ConversationUpdate,
    ConversationsApi, InferenceApi, InferenceConfig, InferenceConfigPatch, InferenceUpdateAck,
    ModelsApi, RecognitionMode, RecognitionResult, SetCharacterAck, SetModelAck, SovitsModel,
    SystemApi, SystemStatus, TtsApi, VadApi, VadOptions,
};
use sovits_panel::chat::{Conversation, Message, Persona, Role};
use sovits_panel::{PanelError, PanelResult};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MockBackend {
    pub calls: Mutex<Vec<String>>,
    pub models: Mutex<Vec<SovitsModel>>,
    pub characters: Mutex<Vec<Character>>,
    pub inference: Mutex<InferenceConfig>,
    pub asr_info: Mutex<AsrModelInfo>,
    /// Armed failure returned by the next call: (status, detail)
    pub next_failure: Mutex<Option<(u16, String)>>,
    /// Make every TTS call fail
    pub tts_fails: Mutex<bool>,
    /// Server-side conversation store
    pub conversations: Mutex<Vec<Conversation>>,
    ids: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        *backend.models.lock().unwrap() = vec![
            model("a", true),
            model("b", false),
        ];
        *backend.characters.lock().unwrap() = vec![character("alice", true), character("bob", false)];
        *backend.asr_info.lock().unwrap() = AsrModelInfo {
            model_name: "paraformer-zh".into(),
            is_loaded: true,
            funasr_available: true,
            vad_available: true,
            vad_enabled: true,
        };
        backend
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn fail_next(&self, status: u16, detail: &str) {
        *self.next_failure.lock().unwrap() = Some((status, detail.to_string()));
    }

    fn hit(&self, call: impl Into<String>) -> PanelResult<()> {
        self.calls.lock().unwrap().push(call.into());
        match self.next_failure.lock().unwrap().take() {
            Some((status, detail)) => Err(PanelError::Http {
                status,
                detail: Some(detail),
            }),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub fn model(name: &str, is_current: bool) -> SovitsModel {
    SovitsModel {
        name: name.into(),
        path: format!("SoVITS_weights/{name}.pth"),
        is_current,
    }
}

pub fn character(name: &str, is_current: bool) -> Character {
    Character {
        name: name.into(),
        is_current,
    }
}

#[async_trait]
impl ModelsApi for MockBackend {
    async fn fetch_sovits_models(&self) -> PanelResult<Vec<SovitsModel>> {
        self.hit("fetch_sovits_models")?;
        Ok(self.models.lock().unwrap().clone())
    }

    async fn set_sovits_model(&self, model_name: &str) -> PanelResult<SetModelAck> {
        self.hit(format!("set_sovits_model:{model_name}"))?;
        Ok(SetModelAck {
            message: "ok".into(),
            model: model_name.into(),
        })
    }
}

#[async_trait]
impl CharactersApi for MockBackend {
    async fn fetch_characters(&self) -> PanelResult<Vec<Character>> {
        self.hit("fetch_characters")?;
        Ok(self.characters.lock().unwrap().clone())
    }

    async fn set_character(&self, character_name: &str) -> PanelResult<SetCharacterAck> {
        self.hit(format!("set_character:{character_name}"))?;
        Ok(SetCharacterAck {
            message: "ok".into(),
            character: character_name.into(),
            audio_path: Some(format!("characters/{character_name}/ref.wav")),
            audio_text: Some(format!("{character_name} reference")),
        })
    }
}

#[async_trait]
impl InferenceApi for MockBackend {
    async fn fetch_inference_config(&self) -> PanelResult<InferenceConfig> {
        self.hit("fetch_inference_config")?;
        Ok(self.inference.lock().unwrap().clone())
    }

    async fn update_inference_config(
        &self,
        patch: &InferenceConfigPatch,
    ) -> PanelResult<InferenceUpdateAck> {
        self.hit("update_inference_config")?;
        let mut current = serde_json::to_value(&*self.inference.lock().unwrap())?;
        if let (Some(target), serde_json::Value::Object(changes)) =
            (current.as_object_mut(), serde_json::to_value(patch)?)
        {
            target.extend(changes);
        }
        let config: InferenceConfig = serde_json::from_value(current)?;
        *self.inference.lock().unwrap() = config.clone();
        Ok(InferenceUpdateAck {
            message: "updated".into(),
            config,
        })
    }
}

#[async_trait]
impl TtsApi for MockBackend {
    async fn text_to_speech(&self, text: &str) -> PanelResult<Vec<u8>> {
        self.hit(format!("text_to_speech:{text}"))?;
        if *self.tts_fails.lock().unwrap() {
            return Err(PanelError::Http {
                status: 500,
                detail: Some("TTS engine crashed".into()),
            });
        }
        let mut audio = b"RIFF".to_vec();
        audio.extend_from_slice(text.as_bytes());
        Ok(audio)
    }
}

#[async_trait]
impl SystemApi for MockBackend {
    async fn fetch_system_status(&self) -> PanelResult<SystemStatus> {
        self.hit("fetch_system_status")?;
        Ok(SystemStatus {
            device: Some("cuda".into()),
            version: Some("v2".into()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl AsrApi for MockBackend {
    async fn fetch_asr_model_info(&self) -> PanelResult<AsrModelInfo> {
        self.hit("fetch_asr_model_info")?;
        Ok(self.asr_info.lock().unwrap().clone())
    }

    async fn fetch_asr_model_status(&self) -> PanelResult<serde_json::Value> {
        self.hit("fetch_asr_model_status")?;
        Ok(json!({"models": []}))
    }

    async fn fetch_asr_config(&self) -> PanelResult<serde_json::Value> {
        self.hit("fetch_asr_config")?;
        Ok(json!({"device": "cpu"}))
    }

    async fn load_asr_model(&self) -> PanelResult<Ack> {
        self.hit("load_asr_model")?;
        self.asr_info.lock().unwrap().is_loaded = true;
        Ok(json!({"success": true}))
    }

    async fn unload_asr_model(&self) -> PanelResult<Ack> {
        self.hit("unload_asr_model")?;
        self.asr_info.lock().unwrap().is_loaded = false;
        Ok(json!({"success": true}))
    }

    async fn recognize(
        &self,
        audio: &AudioUpload,
        mode: RecognitionMode,
    ) -> PanelResult<RecognitionResult> {
        self.hit(format!("recognize:{}:{}", mode, audio.file_name))?;
        Ok(RecognitionResult {
            success: true,
            text: "recognized".into(),
            ..Default::default()
        })
    }

    async fn migrate_asr_models(&self, copy_mode: bool) -> PanelResult<Ack> {
        self.hit(format!("migrate_asr_models:{copy_mode}"))?;
        Ok(json!({"success": true}))
    }

    async fn clean_asr_cache(&self) -> PanelResult<Ack> {
        self.hit("clean_asr_cache")?;
        Ok(json!({"success": true}))
    }

    async fn update_asr_config(
        &self,
        config: &serde_json::Value,
    ) -> PanelResult<serde_json::Value> {
        self.hit("update_asr_config")?;
        Ok(config.clone())
    }
}

#[async_trait]
impl VadApi for MockBackend {
    async fn fetch_vad_status(&self) -> PanelResult<serde_json::Value> {
        self.hit("fetch_vad_status")?;
        Ok(json!({"status": "healthy"}))
    }

    async fn detect_vad_segments(
        &self,
        audio: &AudioUpload,
        options: &VadOptions,
    ) -> PanelResult<serde_json::Value> {
        self.hit(format!("detect_vad_segments:{}", audio.file_name))?;
        Ok(json!({"segments": [[0, 1200]], "options": options}))
    }

    async fn split_audio_by_vad(
        &self,
        audio: &AudioUpload,
        output_format: &str,
    ) -> PanelResult<serde_json::Value> {
        self.hit(format!("split_audio_by_vad:{}:{}", audio.file_name, output_format))?;
        Ok(json!({"files": ["part_0.wav"]}))
    }
}

#[async_trait]
impl ConversationsApi for MockBackend {
    async fn list_conversations(&self) -> PanelResult<Vec<Conversation>> {
        self.hit("list_conversations")?;
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn create_conversation(
        &self,
        title: &str,
        persona: &Persona,
    ) -> PanelResult<Conversation> {
        self.hit(format!("create_conversation:{title}"))?;
        let mut conversation = Conversation::new(title, persona.clone());
        conversation.id = self.next_id("conv");
        self.conversations.lock().unwrap().insert(0, conversation.clone());
        Ok(conversation)
    }

    async fn update_conversation(
        &self,
        conversation_id: &str,
        update: &ConversationUpdate,
    ) -> PanelResult<Conversation> {
        self.hit(format!("update_conversation:{conversation_id}"))?;
        let mut conversations = self.conversations.lock().unwrap();
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| PanelError::NotFound(conversation_id.into()))?;
        if let Some(title) = &update.title {
            conversation.title = title.clone();
        }
        if let Some(persona) = &update.persona {
            conversation.persona = persona.clone();
        }
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> PanelResult<()> {
        self.hit(format!("delete_conversation:{conversation_id}"))?;
        self.conversations
            .lock()
            .unwrap()
            .retain(|c| c.id != conversation_id);
        Ok(())
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> PanelResult<Message> {
        self.hit(format!("add_message:{role}"))?;
        let mut message = Message::new(role, content);
        message.id = self.next_id("msg");
        let mut conversations = self.conversations.lock().unwrap();
        if let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id) {
            conversation.messages.push(message.clone());
        }
        Ok(message)
    }

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> PanelResult<()> {
        self.hit(format!("delete_message:{message_id}"))?;
        let mut conversations = self.conversations.lock().unwrap();
        if let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id) {
            conversation.messages.retain(|m| m.id != message_id);
        }
        Ok(())
    }

    async fn rollback(&self, conversation_id: &str, message_index: usize) -> PanelResult<()> {
        self.hit(format!("rollback:{message_index}"))?;
        let mut conversations = self.conversations.lock().unwrap();
        if let Some(conversation) = conversations.iter_mut().find(|c| c.id == conversation_id) {
            conversation.messages.truncate(message_index + 1);
        }
        Ok(())
    }

    async fn set_current_audio_version(
        &self,
        _conversation_id: &str,
        _message_id: &str,
        version_index: usize,
    ) -> PanelResult<()> {
        self.hit(format!("set_current_audio_version:{version_index}"))
    }

    async fn delete_audio_version(
        &self,
        _conversation_id: &str,
        _message_id: &str,
        version_id: &str,
    ) -> PanelResult<()> {
        self.hit(format!("delete_audio_version:{version_id}"))
    }
}
