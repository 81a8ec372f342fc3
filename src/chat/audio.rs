//! Audio handles and per-message version bookkeeping
//!
//! Synthesized clips are kept in an [`AudioRegistry`] under `blob:` handles,
//! the same way a browser hands out object URLs. A handle belongs to exactly
//! one [`AudioVersion`] and must be revoked when that version goes away.

use super::types::{new_id, AudioVersion, Message};
use crate::error::{PanelError, PanelResult};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const HANDLE_PREFIX: &str = "blob:";

/// In-memory store of playable audio clips keyed by handle
#[derive(Debug, Default)]
pub struct AudioRegistry {
    clips: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl AudioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn clips(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Vec<u8>>>> {
        self.clips.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a clip and return its handle
    pub fn create(&self, bytes: Vec<u8>) -> String {
        let handle = format!("{HANDLE_PREFIX}{}", new_id());
        self.clips().insert(handle.clone(), Arc::new(bytes));
        handle
    }

    pub fn get(&self, handle: &str) -> Option<Arc<Vec<u8>>> {
        self.clips().get(handle).cloned()
    }

    /// Release a handle. Backend URLs are not ours and are ignored.
    pub fn revoke(&self, handle: &str) -> bool {
        if !handle.starts_with(HANDLE_PREFIX) {
            return false;
        }
        let removed = self.clips().remove(handle).is_some();
        if removed {
            debug!("🗑️ Revoked audio handle {}", handle);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.clips().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a clip to disk
    pub async fn save(&self, handle: &str, path: &Path) -> PanelResult<()> {
        let bytes = self
            .get(handle)
            .ok_or_else(|| PanelError::NotFound(format!("audio handle {handle}")))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes.as_slice()).await?;
        Ok(())
    }
}

impl Message {
    /// Append a version and make it current. The first version a message
    /// ever gets is its default.
    pub fn push_audio_version(&mut self, url: String) -> usize {
        let version = AudioVersion {
            id: new_id(),
            url,
            timestamp: Utc::now(),
            is_default: self.audio_versions.is_empty(),
        };
        self.audio_versions.push(version);
        let index = self.audio_versions.len() - 1;
        self.current_audio_version = Some(index);
        index
    }

    /// Select a version; out-of-range indices leave the message untouched
    pub fn select_audio_version(&mut self, index: usize) -> bool {
        if index < self.audio_versions.len() {
            self.current_audio_version = Some(index);
            true
        } else {
            false
        }
    }

    /// Remove a version, keeping the selection on the same logical clip
    /// where possible. Returns the removed version so its handle can be
    /// released.
    pub fn remove_audio_version(&mut self, index: usize) -> Option<AudioVersion> {
        if index >= self.audio_versions.len() {
            return None;
        }
        let removed = self.audio_versions.remove(index);
        let remaining = self.audio_versions.len();

        self.current_audio_version = match self.current_audio_version {
            Some(current) if current == index => {
                if remaining == 0 {
                    None
                } else {
                    Some(current.min(remaining - 1))
                }
            }
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        Some(removed)
    }

    pub fn current_audio(&self) -> Option<&AudioVersion> {
        self.current_audio_version
            .and_then(|i| self.audio_versions.get(i))
    }

    /// Drop every version (and a legacy URL), returning the handles to release
    pub fn take_audio_handles(&mut self) -> Vec<String> {
        let mut handles: Vec<String> = self.audio_versions.drain(..).map(|v| v.url).collect();
        handles.extend(self.audio_url.take());
        self.current_audio_version = None;
        handles
    }
}
