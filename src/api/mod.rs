//! Backend HTTP Adapter
//!
//! `BackendClient` wraps one `reqwest::Client` configured with the backend
//! base URL, a fixed request timeout and JSON default headers. Each resource
//! family is exposed through its own trait so stores and tests can swap the
//! transport out:
//! - models, characters, inference config, TTS, system status
//! - ASR and VAD (multipart uploads)
//! - persisted conversations

pub mod asr;
pub mod characters;
pub mod conversations;
pub mod inference;
pub mod models;
pub mod system;
pub mod tts;
pub mod vad;

use crate::config::Config;
use crate::error::{PanelError, PanelResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub use asr::{AsrApi, AsrModelInfo, RecognitionMode, RecognitionResult};
pub use characters::{Character, CharactersApi, SetCharacterAck};
pub use conversations::{ConversationUpdate, ConversationsApi};
pub use inference::{InferenceApi, InferenceConfig, InferenceConfigPatch, InferenceUpdateAck};
pub use models::{ModelsApi, SetModelAck, SovitsModel};
pub use system::{SystemApi, SystemStatus};
pub use tts::TtsApi;
pub use vad::{VadApi, VadOptions};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Generic acknowledgement returned by action endpoints (`load`, `unload`, ...)
pub type Ack = serde_json::Value;

/// Audio payload destined for a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read an audio file from disk, keeping its file name for the upload
    pub async fn from_path(path: &Path) -> PanelResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.wav".to_string());
        Ok(Self { file_name, bytes })
    }

    pub(crate) fn part(&self) -> multipart::Part {
        multipart::Part::bytes(self.bytes.clone()).file_name(self.file_name.clone())
    }
}

/// HTTP client for the TTS/ASR backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> PanelResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> PanelResult<Self> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PanelResult<T> {
        debug!("GET {}", path);
        Self::read_json(self.client.get(self.url(path))).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> PanelResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", path);
        Self::read_json(self.client.post(self.url(path)).json(body)).await
    }

    /// POST without a body (query-parameter style actions)
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> PanelResult<T> {
        debug!("POST {}", path);
        Self::read_json(self.client.post(self.url(path))).await
    }

    pub(crate) async fn put_json<B, T>(&self, path: &str, body: &B) -> PanelResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("PUT {}", path);
        Self::read_json(self.client.put(self.url(path)).json(body)).await
    }

    pub(crate) async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> PanelResult<T> {
        debug!("PUT {}", path);
        Self::read_json(self.client.put(self.url(path))).await
    }

    pub(crate) async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> PanelResult<T> {
        debug!("DELETE {}", path);
        Self::read_json(self.client.delete(self.url(path))).await
    }

    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> PanelResult<T> {
        debug!("POST {} (multipart)", path);
        Self::read_json(self.client.post(self.url(path)).multipart(form)).await
    }

    /// POST a JSON body and return the raw response bytes (audio endpoints)
    pub(crate) async fn post_for_bytes<B>(&self, path: &str, body: &B) -> PanelResult<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        debug!("POST {} (binary response)", path);
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn read_json<T: DeserializeOwned>(request: RequestBuilder) -> PanelResult<T> {
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| PanelError::MalformedResponse(e.to_string()))
    }

    async fn check_status(response: reqwest::Response) -> PanelResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PanelError::from_status(status.as_u16(), &body))
    }
}

/// Percent-encode a single query or path component
pub(crate) fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
