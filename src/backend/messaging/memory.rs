//! In-process chat store
//!
//! Used when no database is configured and throughout the test suite. A single
//! lock guards every table, so each operation is atomic and first contact
//! between two users can never produce two conversations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::store::{ChatStore, StoreError};
use crate::shared::messaging::{
    ChatMessage, Conversation, ConversationId, ConversationSummary, MessageId, NewMessage,
    ParticipantPair, UserId,
};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, String>,
    conversations: HashMap<ConversationId, Conversation>,
    by_pair: HashMap<ParticipantPair, ConversationId>,
    messages: Vec<ChatMessage>,
    next_conversation_id: ConversationId,
    next_message_id: MessageId,
}

impl Tables {
    fn with_names(&self, mut message: ChatMessage) -> ChatMessage {
        message.sender_name = self.users.get(&message.sender_id).cloned();
        message.receiver_name = self.users.get(&message.receiver_id).cloned();
        message
    }
}

/// Chat store that keeps everything in memory
#[derive(Default)]
pub struct MemoryChatStore {
    tables: Mutex<Tables>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a known set of users
    pub fn with_users<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = (UserId, S)>,
        S: Into<String>,
    {
        let tables = Tables {
            users: users
                .into_iter()
                .map(|(id, name)| (id, name.into()))
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    pub async fn conversation_count(&self) -> usize {
        self.tables.lock().await.conversations.len()
    }

    pub async fn message_count(&self) -> usize {
        self.tables.lock().await.messages.len()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn resolve_or_create_conversation(
        &self,
        pair: ParticipantPair,
    ) -> Result<Conversation, StoreError> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables
            .by_pair
            .get(&pair)
            .and_then(|id| tables.conversations.get(id))
        {
            return Ok(existing.clone());
        }

        tables.next_conversation_id += 1;
        let now = Utc::now();
        let conversation = Conversation {
            id: tables.next_conversation_id,
            user1_id: pair.lo(),
            user2_id: pair.hi(),
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.by_pair.insert(pair, conversation.id);
        tables
            .conversations
            .insert(conversation.id, conversation.clone());

        tracing::debug!(
            "Created conversation {} for users {} and {}",
            conversation.id,
            pair.lo(),
            pair.hi()
        );
        Ok(conversation)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let mut tables = self.tables.lock().await;

        let conversation = tables
            .conversations
            .get(&message.conversation_id)
            .ok_or_else(|| {
                StoreError::not_found(format!("conversation {}", message.conversation_id))
            })?;
        let pair = ParticipantPair::new(message.sender_id, message.receiver_id)?;
        if conversation.pair() != pair {
            return Err(StoreError::constraint(format!(
                "users {} and {} are not the participants of conversation {}",
                message.sender_id, message.receiver_id, message.conversation_id
            )));
        }

        tables.next_message_id += 1;
        let stored = ChatMessage {
            id: tables.next_message_id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            message: message.message,
            message_type: message.message_type,
            is_read: false,
            read_at: None,
            created_at: message.created_at,
            updated_at: message.created_at,
            sender_name: None,
            receiver_name: None,
        };
        tables.messages.push(stored.clone());
        Ok(stored)
    }

    async fn fetch_recent_messages(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let tables = self.tables.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);

        let mut recent: Vec<ChatMessage> = tables
            .messages
            .iter()
            .filter(|m| m.involves(user_id))
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent.truncate(limit);

        Ok(recent.into_iter().map(|m| tables.with_names(m)).collect())
    }

    async fn touch_conversation(
        &self,
        id: ConversationId,
        when: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(conversation) = tables.conversations.get_mut(&id) {
            conversation.last_message_at = Some(when);
            conversation.updated_at = when;
        }
        Ok(())
    }

    async fn lookup_display_name(&self, user_id: UserId) -> Result<Option<String>, StoreError> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let tables = self.tables.lock().await;

        let mut summaries: Vec<ConversationSummary> = tables
            .conversations
            .values()
            .filter(|c| c.has_participant(user_id))
            .map(|c| {
                let in_conversation = tables.messages.iter().filter(|m| m.conversation_id == c.id);
                let unread_count = in_conversation
                    .clone()
                    .filter(|m| m.receiver_id == user_id && !m.is_read)
                    .count() as i64;
                let last_message = in_conversation
                    .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
                    .map(|m| m.message.clone());

                ConversationSummary {
                    conversation: c.clone(),
                    user1_name: tables.users.get(&c.user1_id).cloned(),
                    user2_name: tables.users.get(&c.user2_id).cloned(),
                    unread_count,
                    last_message,
                }
            })
            .collect();

        // None sorts first in ascending order, so reversing puts it last
        summaries.sort_by(|a, b| {
            b.conversation
                .last_message_at
                .cmp(&a.conversation.last_message_at)
                .then(b.conversation.id.cmp(&a.conversation.id))
        });
        Ok(summaries)
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
        participant: UserId,
    ) -> Result<Option<Conversation>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .conversations
            .get(&id)
            .filter(|c| c.has_participant(participant))
            .cloned())
    }

    async fn list_messages(&self, id: ConversationId) -> Result<Vec<ChatMessage>, StoreError> {
        let tables = self.tables.lock().await;

        let mut messages: Vec<ChatMessage> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(messages.into_iter().map(|m| tables.with_names(m)).collect())
    }

    async fn mark_conversation_read(
        &self,
        id: ConversationId,
        reader: UserId,
        when: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut changed = 0;

        for message in tables
            .messages
            .iter_mut()
            .filter(|m| m.conversation_id == id && m.receiver_id == reader && !m.is_read)
        {
            message.is_read = true;
            message.read_at = Some(when);
            message.updated_at = when;
            changed += 1;
        }
        Ok(changed)
    }

    async fn unread_count(&self, user_id: UserId) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
            .count() as i64)
    }
}
