//! Backend conversation persistence (`/api/conversations`)

use super::{encode, Ack, BackendClient};
use crate::chat::types::{Conversation, Message, Persona, Role};
use crate::error::PanelResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Fields accepted by `PUT /api/conversations/{id}`; unset fields are kept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
}

#[derive(Serialize)]
struct NewConversation<'a> {
    title: &'a str,
    persona: &'a Persona,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    role: Role,
    content: &'a str,
}

#[async_trait]
pub trait ConversationsApi: Send + Sync {
    /// All stored conversations, most recently updated first
    async fn list_conversations(&self) -> PanelResult<Vec<Conversation>>;

    async fn create_conversation(&self, title: &str, persona: &Persona)
        -> PanelResult<Conversation>;

    async fn update_conversation(
        &self,
        conversation_id: &str,
        update: &ConversationUpdate,
    ) -> PanelResult<Conversation>;

    async fn delete_conversation(&self, conversation_id: &str) -> PanelResult<()>;

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> PanelResult<Message>;

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> PanelResult<()>;

    /// Keep messages `0..=message_index`
    async fn rollback(&self, conversation_id: &str, message_index: usize) -> PanelResult<()>;

    async fn set_current_audio_version(
        &self,
        conversation_id: &str,
        message_id: &str,
        version_index: usize,
    ) -> PanelResult<()>;

    async fn delete_audio_version(
        &self,
        conversation_id: &str,
        message_id: &str,
        version_id: &str,
    ) -> PanelResult<()>;
}

#[async_trait]
impl ConversationsApi for BackendClient {
    async fn list_conversations(&self) -> PanelResult<Vec<Conversation>> {
        self.get_json("/api/conversations/").await
    }

    async fn create_conversation(
        &self,
        title: &str,
        persona: &Persona,
    ) -> PanelResult<Conversation> {
        self.post_json("/api/conversations/", &NewConversation { title, persona })
            .await
    }

    async fn update_conversation(
        &self,
        conversation_id: &str,
        update: &ConversationUpdate,
    ) -> PanelResult<Conversation> {
        self.put_json(&format!("/api/conversations/{}", encode(conversation_id)), update)
            .await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> PanelResult<()> {
        let _: Ack = self
            .delete_json(&format!("/api/conversations/{}", encode(conversation_id)))
            .await?;
        Ok(())
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> PanelResult<Message> {
        self.post_json(
            &format!("/api/conversations/{}/messages", encode(conversation_id)),
            &NewMessage { role, content },
        )
        .await
    }

    async fn delete_message(&self, conversation_id: &str, message_id: &str) -> PanelResult<()> {
        let _: Ack = self
            .delete_json(&format!(
                "/api/conversations/{}/messages/{}",
                encode(conversation_id),
                encode(message_id)
            ))
            .await?;
        Ok(())
    }

    async fn rollback(&self, conversation_id: &str, message_index: usize) -> PanelResult<()> {
        let _: Ack = self
            .post_empty(&format!(
                "/api/conversations/{}/rollback/{}",
                encode(conversation_id),
                message_index
            ))
            .await?;
        Ok(())
    }

    async fn set_current_audio_version(
        &self,
        conversation_id: &str,
        message_id: &str,
        version_index: usize,
    ) -> PanelResult<()> {
        let _: Ack = self
            .put_empty(&format!(
                "/api/conversations/{}/messages/{}/audio/current?version_index={}",
                encode(conversation_id),
                encode(message_id),
                version_index
            ))
            .await?;
        Ok(())
    }

    async fn delete_audio_version(
        &self,
        conversation_id: &str,
        message_id: &str,
        version_id: &str,
    ) -> PanelResult<()> {
        let _: Ack = self
            .delete_json(&format!(
                "/api/conversations/{}/messages/{}/audio/{}",
                encode(conversation_id),
                encode(message_id),
                encode(version_id)
            ))
            .await?;
        Ok(())
    }
}
