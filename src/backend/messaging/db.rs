//! PostgreSQL store for conversations and messages
//!
//! Conversation uniqueness is enforced by `UNIQUE (user1_id, user2_id)` and
//! `CHECK (user1_id < user2_id)` (see `migrations/`). First contact inserts
//! with `ON CONFLICT DO NOTHING` and re-reads when another writer won.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::store::{ChatStore, StoreError};
use crate::shared::messaging::{
    ChatMessage, Conversation, ConversationId, ConversationSummary, MessageType, NewMessage,
    ParticipantPair, UserId,
};

const CONVERSATION_COLUMNS: &str =
    "c.id, c.user1_id, c.user2_id, c.last_message_at, c.created_at, c.updated_at";

const MESSAGE_COLUMNS: &str = "m.id, m.conversation_id, m.sender_id, m.receiver_id, m.message, \
     m.message_type, m.is_read, m.read_at, m.created_at, m.updated_at";

/// Chat store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_pair(&self, pair: ParticipantPair) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c \
             WHERE c.user1_id = $1 AND c.user2_id = $2"
        ))
        .bind(pair.lo())
        .bind(pair.hi())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }
}

fn conversation_from_row(row: &PgRow) -> Result<Conversation, StoreError> {
    Ok(Conversation {
        id: row.try_get("id")?,
        user1_id: row.try_get("user1_id")?,
        user2_id: row.try_get("user2_id")?,
        last_message_at: row.try_get("last_message_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map a message row; name columns are only present on joined queries
fn message_from_row(row: &PgRow) -> Result<ChatMessage, StoreError> {
    let message_type: String = row.try_get("message_type")?;
    Ok(ChatMessage {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        message: row.try_get("message")?,
        message_type: MessageType::from(message_type),
        is_read: row.try_get("is_read")?,
        read_at: row.try_get("read_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        sender_name: row.try_get::<Option<String>, _>("sender_name").ok().flatten(),
        receiver_name: row.try_get::<Option<String>, _>("receiver_name").ok().flatten(),
    })
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn resolve_or_create_conversation(
        &self,
        pair: ParticipantPair,
    ) -> Result<Conversation, StoreError> {
        if let Some(existing) = self.find_by_pair(pair).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let inserted = sqlx::query(
            r#"
            INSERT INTO conversations (user1_id, user2_id, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user1_id, user2_id) DO NOTHING
            RETURNING id, user1_id, user2_id, last_message_at, created_at, updated_at
            "#,
        )
        .bind(pair.lo())
        .bind(pair.hi())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => {
                let conversation = conversation_from_row(&row)?;
                tracing::info!(
                    "Created conversation {} for users {} and {}",
                    conversation.id,
                    pair.lo(),
                    pair.hi()
                );
                Ok(conversation)
            }
            None => {
                // A concurrent first contact created the row between our read and insert
                tracing::debug!(
                    "Conversation for users {} and {} created concurrently, re-reading",
                    pair.lo(),
                    pair.hi()
                );
                self.find_by_pair(pair).await?.ok_or_else(|| {
                    StoreError::not_found(format!(
                        "conversation for users {} and {}",
                        pair.lo(),
                        pair.hi()
                    ))
                })
            }
        }
    }

    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, sender_id, receiver_id, message, message_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id, conversation_id, sender_id, receiver_id, message, message_type, is_read, read_at, created_at, updated_at
            "#,
        )
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.message)
        .bind(message.message_type.as_str())
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        message_from_row(&row)
    }

    async fn fetch_recent_messages(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS}, u1.name AS sender_name, u2.name AS receiver_name \
             FROM messages m \
             LEFT JOIN users u1 ON m.sender_id = u1.id \
             LEFT JOIN users u2 ON m.receiver_id = u2.id \
             WHERE m.sender_id = $1 OR m.receiver_id = $1 \
             ORDER BY m.created_at DESC, m.id DESC \
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn touch_conversation(
        &self,
        id: ConversationId,
        when: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE conversations SET last_message_at = $1, updated_at = $1 WHERE id = $2")
            .bind(when)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn lookup_display_name(&self, user_id: UserId) -> Result<Option<String>, StoreError> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS}, \
                    u1.name AS user1_name, \
                    u2.name AS user2_name, \
                    (SELECT COUNT(*) FROM messages m \
                      WHERE m.conversation_id = c.id AND m.receiver_id = $1 AND m.is_read = FALSE) AS unread_count, \
                    (SELECT m.message FROM messages m \
                      WHERE m.conversation_id = c.id \
                      ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_message \
             FROM conversations c \
             LEFT JOIN users u1 ON c.user1_id = u1.id \
             LEFT JOIN users u2 ON c.user2_id = u2.id \
             WHERE c.user1_id = $1 OR c.user2_id = $1 \
             ORDER BY c.last_message_at DESC NULLS LAST, c.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ConversationSummary {
                    conversation: conversation_from_row(row)?,
                    user1_name: row.try_get("user1_name")?,
                    user2_name: row.try_get("user2_name")?,
                    unread_count: row.try_get("unread_count")?,
                    last_message: row.try_get("last_message")?,
                })
            })
            .collect()
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
        participant: UserId,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations c \
             WHERE c.id = $1 AND (c.user1_id = $2 OR c.user2_id = $2)"
        ))
        .bind(id)
        .bind(participant)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn list_messages(&self, id: ConversationId) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS}, u1.name AS sender_name, u2.name AS receiver_name \
             FROM messages m \
             LEFT JOIN users u1 ON m.sender_id = u1.id \
             LEFT JOIN users u2 ON m.receiver_id = u2.id \
             WHERE m.conversation_id = $1 \
             ORDER BY m.created_at ASC, m.id ASC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn mark_conversation_read(
        &self,
        id: ConversationId,
        reader: UserId,
        when: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = $1, updated_at = $1
            WHERE conversation_id = $2
            AND receiver_id = $3
            AND is_read = FALSE
            "#,
        )
        .bind(when)
        .bind(id)
        .bind(reader)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: UserId) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
