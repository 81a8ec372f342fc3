//! SoVITS Panel Library
//!
//! Client-side state for a GPT-SoVITS TTS/ASR backend plus an LLM chat
//! whose replies are voiced by that backend.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod store;

pub use error::{PanelError, PanelResult};
