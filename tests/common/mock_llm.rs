//! Mock LLM and settings source for testing

use async_trait::async_trait;
use sovits_panel::chat::{AiConfig, ChatCompletion, ChatSettings, LlmMessage, SettingsSource};
use sovits_panel::{PanelError, PanelResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records every request; replies come from a script, else `"reply N"`
#[derive(Debug, Default)]
pub struct MockLlm {
    pub requests: Mutex<Vec<Vec<LlmMessage>>>,
    script: Mutex<VecDeque<PanelResult<String>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: &str) {
        self.script.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn push_failure(&self, error: PanelError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<Vec<LlmMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Vec<LlmMessage> {
        self.requests().pop().unwrap_or_default()
    }
}

#[async_trait]
impl ChatCompletion for MockLlm {
    async fn complete(&self, _config: &AiConfig, messages: &[LlmMessage]) -> PanelResult<String> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            requests.len()
        };
        match self.script.lock().unwrap().pop_front() {
            Some(scripted) => scripted,
            None => Ok(format!("reply {count}")),
        }
    }
}

/// Fixed settings that count how often they were loaded
#[derive(Debug, Default)]
pub struct CountingSettings {
    pub settings: Mutex<ChatSettings>,
    pub loads: AtomicUsize,
}

impl CountingSettings {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsSource for CountingSettings {
    async fn load(&self) -> PanelResult<ChatSettings> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.settings.lock().unwrap().clone())
    }
}
