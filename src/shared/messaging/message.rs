//! Chat Message Data Structure
//!
//! Represents a persisted message in a one-to-one conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversation::ConversationId;

/// User identifier, as issued by the authentication service
pub type UserId = i64;

/// Message identifier
pub type MessageId = i64;

/// Type of message content
///
/// Serialized as a plain string tag; unknown tags are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Plain text message
    #[default]
    Text,
    /// Image message (body carries the URL)
    Image,
    /// File attachment (body carries the URL)
    File,
    /// System message (e.g., "conversation started")
    System,
    /// Any other tag sent by a client
    Other(String),
}

impl MessageType {
    /// Tag used on the wire and in the database
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
            MessageType::System => "system",
            MessageType::Other(tag) => tag.as_str(),
        }
    }

    /// Parse an optional tag; absent or empty means text
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            None | Some("") => MessageType::Text,
            Some(tag) => MessageType::from(tag.to_string()),
        }
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "" | "text" => MessageType::Text,
            "image" => MessageType::Image,
            "file" => MessageType::File,
            "system" => MessageType::System,
            _ => MessageType::Other(tag),
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Other(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted chat message
///
/// Immutable once created except for the one-way unread → read transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Conversation this message belongs to
    pub conversation_id: ConversationId,
    /// User who sent the message
    pub sender_id: UserId,
    /// User the message is addressed to
    pub receiver_id: UserId,
    /// Message body
    pub message: String,
    /// Type of message
    #[serde(default)]
    pub message_type: MessageType,
    /// Whether the receiver has read the message
    pub is_read: bool,
    /// When the receiver read the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    /// Authoritative ordering timestamp
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sender display name (joined, not stored on the row)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Receiver display name (joined, not stored on the row)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
}

impl ChatMessage {
    /// Check if user is the sender or the receiver
    pub fn involves(&self, user_id: UserId) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

/// A message about to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
}

/// Request to send a message over REST
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: UserId,
    pub message: String,
    #[serde(default)]
    pub message_type: Option<String>,
}

/// Response for the unread counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadCountResponse {
    pub count: i64,
}
