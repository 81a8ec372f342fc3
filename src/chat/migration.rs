//! Upgrade of single-URL audio messages to the versioned shape

use super::types::{new_id, AudioVersion, Conversation, Message};
use tracing::info;

/// Normalize every message of `conversations`; returns how many legacy
/// messages were converted. Running it again changes nothing.
pub fn migrate_audio_data(conversations: &mut [Conversation]) -> usize {
    let mut migrated = 0;
    for message in conversations.iter_mut().flat_map(|c| c.messages.iter_mut()) {
        if migrate_message(message) {
            migrated += 1;
        }
    }
    if migrated > 0 {
        info!("🔁 Migrated {} legacy audio messages", migrated);
    }
    migrated
}

fn migrate_message(message: &mut Message) -> bool {
    let mut migrated = false;

    if let Some(url) = message.audio_url.take() {
        if message.audio_versions.is_empty() {
            message.audio_versions.push(AudioVersion {
                id: new_id(),
                url,
                timestamp: message.timestamp,
                is_default: true,
            });
            message.current_audio_version = Some(0);
            migrated = true;
        }
    }

    let len = message.audio_versions.len();
    message.current_audio_version = match message.current_audio_version {
        _ if len == 0 => None,
        None => Some(0),
        Some(i) => Some(i.min(len - 1)),
    };
    // A flag persisted mid-generation can never clear on its own
    message.audio_generating = false;

    migrated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::settings::default_personas;
    use crate::chat::types::Role;

    fn conversation_with(messages: Vec<Message>) -> Conversation {
        let mut conversation = Conversation::new("t", default_personas().remove(0));
        conversation.messages = messages;
        conversation
    }

    fn legacy_message() -> Message {
        let mut message = Message::new(Role::Assistant, "old");
        message.audio_url = Some("blob:legacy".into());
        message
    }

    #[test]
    fn test_legacy_message_gets_default_version() {
        let mut conversations = vec![conversation_with(vec![legacy_message()])];
        assert_eq!(migrate_audio_data(&mut conversations), 1);

        let message = &conversations[0].messages[0];
        assert_eq!(message.audio_versions.len(), 1);
        assert_eq!(message.audio_versions[0].url, "blob:legacy");
        assert!(message.audio_versions[0].is_default);
        assert_eq!(message.current_audio_version, Some(0));
        assert!(message.audio_url.is_none());
    }

    #[test]
    fn test_counts_legacy_messages_across_conversations() {
        let mut conversations = vec![
            conversation_with(vec![legacy_message(), Message::new(Role::User, "hi")]),
            conversation_with(vec![legacy_message()]),
        ];
        assert_eq!(migrate_audio_data(&mut conversations), 2);
        assert_eq!(conversations[1].messages[0].current_audio_version, Some(0));
    }

    #[test]
    fn test_migration_is_idempotent() {
        let mut once = vec![conversation_with(vec![legacy_message()])];
        migrate_audio_data(&mut once);
        let mut twice = once.clone();
        assert_eq!(migrate_audio_data(&mut twice), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_selection_is_normalized() {
        let mut with_versions = Message::new(Role::Assistant, "a");
        with_versions.push_audio_version("blob:1".into());
        with_versions.current_audio_version = None;

        let mut out_of_range = Message::new(Role::Assistant, "b");
        out_of_range.push_audio_version("blob:2".into());
        out_of_range.current_audio_version = Some(5);

        let mut empty = Message::new(Role::User, "c");
        empty.current_audio_version = Some(3);
        empty.audio_generating = true;

        let mut conversations = vec![conversation_with(vec![with_versions, out_of_range, empty])];
        assert_eq!(migrate_audio_data(&mut conversations), 0);

        let messages = &conversations[0].messages;
        assert_eq!(messages[0].current_audio_version, Some(0));
        assert_eq!(messages[1].current_audio_version, Some(0));
        assert_eq!(messages[2].current_audio_version, None);
        assert!(!messages[2].audio_generating);
    }
}
