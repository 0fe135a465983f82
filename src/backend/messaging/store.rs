//! Durable store interface for conversations and messages
//!
//! The real-time path and the REST handlers only ever talk to storage through
//! [`ChatStore`], so the PostgreSQL store and the in-process store are
//! interchangeable behind an `Arc<dyn ChatStore>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::shared::error::SharedError;
use crate::shared::messaging::{
    ChatMessage, Conversation, ConversationId, ConversationSummary, NewMessage, ParticipantPair,
    UserId,
};

/// Errors returned by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write would break a storage invariant
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The caller supplied an invalid value
    #[error(transparent)]
    Invalid(#[from] SharedError),
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }
}

/// Persistence for one-to-one chat
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Return the conversation for `pair`, creating it on first contact.
    ///
    /// Must converge to a single row when both directions race.
    async fn resolve_or_create_conversation(
        &self,
        pair: ParticipantPair,
    ) -> Result<Conversation, StoreError>;

    /// Persist a message and return the stored row
    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError>;

    /// Most recent messages sent or received by `user_id`, newest first
    async fn fetch_recent_messages(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Stamp the conversation's last activity
    async fn touch_conversation(
        &self,
        id: ConversationId,
        when: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Display name of a user, if the user exists
    async fn lookup_display_name(&self, user_id: UserId) -> Result<Option<String>, StoreError>;

    /// Conversations of `user_id`, most recently active first
    async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationSummary>, StoreError>;

    /// A conversation, only if `participant` belongs to it
    async fn find_conversation(
        &self,
        id: ConversationId,
        participant: UserId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// All messages of a conversation, oldest first
    async fn list_messages(&self, id: ConversationId) -> Result<Vec<ChatMessage>, StoreError>;

    /// Mark unread messages addressed to `reader` as read; returns rows changed
    async fn mark_conversation_read(
        &self,
        id: ConversationId,
        reader: UserId,
        when: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Number of unread messages addressed to `user_id`
    async fn unread_count(&self, user_id: UserId) -> Result<i64, StoreError>;
}
