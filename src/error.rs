//! Panel Error Types
//!
//! One error enum shared by the HTTP adapter, the stores and the chat engine.

use thiserror::Error;

/// Central error type for the panel
#[derive(Error, Debug)]
pub enum PanelError {
    /// The request never produced a response (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("request failed"))]
    Http { status: u16, detail: Option<String> },

    /// The response arrived but did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for panel operations
pub type PanelResult<T> = Result<T, PanelError>;

impl PanelError {
    /// Human-readable message recorded into a store's `error` slot.
    ///
    /// Prefers the upstream `detail` for HTTP failures and falls back to the
    /// generic display text otherwise.
    pub fn user_message(&self) -> String {
        match self {
            PanelError::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }

    /// Build an HTTP error from a status and raw response body.
    ///
    /// Understands both FastAPI (`{"detail": ...}`) and OpenAI
    /// (`{"error": {"message": ...}}`) error bodies.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(detail_text)
                    .or_else(|| {
                        value
                            .get("error")
                            .and_then(|e| e.get("message"))
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                    })
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            });
        PanelError::Http { status, detail }
    }
}

fn detail_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        // FastAPI validation errors arrive as a list of objects
        other => Some(other.to_string()),
    }
}

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PanelError::MalformedResponse(err.to_string())
        } else {
            PanelError::Transport(err.to_string())
        }
    }
}
