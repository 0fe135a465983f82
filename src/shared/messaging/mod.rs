//! Messaging Module
//!
//! This module contains the data structures for one-to-one chat:
//!
//! - `ParticipantPair` - Canonical `(lo, hi)` ordering of two users
//! - `Conversation` - A conversation between two users
//! - `ChatMessage` - A persisted message in a conversation
//!
//! # Usage
//!
//! ```rust
//! use saas_manager::shared::messaging::{ChatMessage, Conversation, ParticipantPair};
//! ```

pub mod conversation;
pub mod message;

// Re-export all types
pub use conversation::{
    Conversation, ConversationId, ConversationSummary, OpenConversationRequest, ParticipantPair,
};
pub use message::{
    ChatMessage, MessageId, MessageType, NewMessage, SendMessageRequest, UnreadCountResponse,
    UserId,
};
