//! Chat message delivery to the durable store
//!
//! Shared by the real-time path and the REST send endpoint. The steps run in
//! order: resolve the conversation, insert the message, attach the sender's
//! display name, stamp the conversation. Only the first two can fail the
//! delivery; a failed stamp is logged and the stored message is still returned.

use chrono::Utc;

use super::store::{ChatStore, StoreError};
use crate::shared::messaging::{ChatMessage, MessageType, NewMessage, ParticipantPair, UserId};

/// Persist one chat message from `sender_id` to `receiver_id`
///
/// `sender_name` is the name carried by the caller's credential; when it is
/// empty the name is looked up in the store.
pub async fn deliver_chat_message(
    store: &dyn ChatStore,
    sender_id: UserId,
    sender_name: &str,
    receiver_id: UserId,
    body: String,
    message_type: MessageType,
) -> Result<ChatMessage, StoreError> {
    let pair = ParticipantPair::new(sender_id, receiver_id)?;
    let conversation = store.resolve_or_create_conversation(pair).await?;

    let now = Utc::now();
    let mut stored = store
        .insert_message(NewMessage {
            conversation_id: conversation.id,
            sender_id,
            receiver_id,
            message: body,
            message_type,
            created_at: now,
        })
        .await?;

    stored.sender_name = resolve_sender_name(store, sender_id, sender_name).await;

    if let Err(e) = store.touch_conversation(conversation.id, now).await {
        tracing::error!(
            "Failed to update last activity of conversation {}: {:?}",
            conversation.id,
            e
        );
    }

    Ok(stored)
}

async fn resolve_sender_name(
    store: &dyn ChatStore,
    sender_id: UserId,
    known: &str,
) -> Option<String> {
    if !known.is_empty() {
        return Some(known.to_string());
    }
    match store.lookup_display_name(sender_id).await {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("Failed to look up name of user {}: {:?}", sender_id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::messaging::memory::MemoryChatStore;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_delivery_persists_and_stamps() {
        let store = MemoryChatStore::new();

        let stored = deliver_chat_message(&store, 1, "Alice", 2, "hi".into(), MessageType::Text)
            .await
            .unwrap();

        assert_eq!(stored.sender_id, 1);
        assert_eq!(stored.receiver_id, 2);
        assert_eq!(stored.sender_name.as_deref(), Some("Alice"));
        assert!(!stored.is_read);

        let conversation = store
            .find_conversation(stored.conversation_id, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.last_message_at, Some(stored.created_at));
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn test_both_directions_share_a_conversation() {
        let store = MemoryChatStore::new();

        let first = deliver_chat_message(&store, 1, "Alice", 2, "ping".into(), MessageType::Text)
            .await
            .unwrap();
        let reply = deliver_chat_message(&store, 2, "Bob", 1, "pong".into(), MessageType::Text)
            .await
            .unwrap();

        assert_eq!(first.conversation_id, reply.conversation_id);
        assert_eq!(store.conversation_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_name_is_looked_up() {
        let store = MemoryChatStore::with_users([(1, "Alice")]);

        let stored = deliver_chat_message(&store, 1, "", 2, "hi".into(), MessageType::Text)
            .await
            .unwrap();
        assert_eq!(stored.sender_name.as_deref(), Some("Alice"));

        let unknown = deliver_chat_message(&store, 9, "", 2, "hi".into(), MessageType::Text)
            .await
            .unwrap();
        assert_eq!(unknown.sender_name, None);
    }

    #[tokio::test]
    async fn test_self_addressed_message_is_rejected() {
        let store = MemoryChatStore::new();

        let result =
            deliver_chat_message(&store, 4, "Dana", 4, "me".into(), MessageType::Text).await;

        assert_matches!(result, Err(StoreError::Invalid(_)));
        assert_eq!(store.conversation_count().await, 0);
    }
}
