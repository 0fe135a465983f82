/**
 * Real-time Chat Protocol
 *
 * This module defines the events exchanged over the real-time connection.
 *
 * # Inbound (client → server)
 *
 * A flat JSON object whose `type` field selects the event. `typing` is the
 * only ephemeral kind; any other value, or no `type` at all, is a chat
 * message. Frames are decoded once here into `ClientEvent` and matched
 * exhaustively by the server.
 *
 * ```json
 * {"receiver_id": 2, "message": "hi"}
 * {"type": "typing", "receiver_id": 2, "is_typing": true}
 * ```
 *
 * # Outbound (server → client)
 *
 * Every event is wrapped in a `{type, data}` envelope:
 *
 * ```json
 * {"type": "online_users", "data": [1, 2]}
 * ```
 */
use serde::{Deserialize, Serialize};

use crate::shared::error::SharedError;
use crate::shared::messaging::{ChatMessage, MessageType, UserId};

/// Discriminator value of the typing indicator
pub const TYPING_KIND: &str = "typing";

/// Raw inbound frame before discrimination
#[derive(Debug, Deserialize)]
struct InboundFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    receiver_id: Option<UserId>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    is_typing: Option<bool>,
}

/// A decoded client event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Chat message to persist and broadcast
    Chat {
        receiver_id: UserId,
        message: String,
        message_type: MessageType,
    },
    /// Ephemeral typing indicator, never persisted
    Typing { receiver_id: UserId, is_typing: bool },
}

impl ClientEvent {
    /// Decode one inbound text frame
    pub fn decode(text: &str) -> Result<Self, SharedError> {
        let frame: InboundFrame = serde_json::from_str(text)?;

        let receiver_id = frame
            .receiver_id
            .ok_or_else(|| SharedError::protocol("missing receiver_id"))?;

        match frame.kind.as_deref() {
            Some(TYPING_KIND) => {
                let is_typing = frame
                    .is_typing
                    .ok_or_else(|| SharedError::protocol("typing event requires is_typing"))?;
                Ok(ClientEvent::Typing {
                    receiver_id,
                    is_typing,
                })
            }
            _ => {
                let message = frame
                    .message
                    .ok_or_else(|| SharedError::protocol("chat message requires message"))?;
                Ok(ClientEvent::Chat {
                    receiver_id,
                    message,
                    message_type: MessageType::from_tag(frame.message_type.as_deref()),
                })
            }
        }
    }
}

/// Payload of a typing broadcast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingEvent {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub is_typing: bool,
}

/// Event pushed to connected clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A persisted message, with sender display name attached
    Message(ChatMessage),
    /// A typing indicator
    Typing(TypingEvent),
    /// Recent messages for the connecting user, newest first
    History(Vec<ChatMessage>),
    /// Distinct user ids with at least one live connection
    OnlineUsers(Vec<UserId>),
}

impl ServerEvent {
    /// Envelope `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Message(_) => "message",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::History(_) => "history",
            ServerEvent::OnlineUsers(_) => "online_users",
        }
    }

    /// Serialize to the JSON envelope
    pub fn to_json(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}
