//! Conversation Data Structure
//!
//! Represents a one-to-one conversation. A pair of users maps to exactly one
//! conversation: participants are always stored in canonical order so that
//! `(a, b)` and `(b, a)` name the same row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::UserId;
use crate::shared::error::SharedError;

/// Conversation identifier
pub type ConversationId = i64;

/// An unordered pair of distinct users, stored as `(lo, hi)` with `lo < hi`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParticipantPair {
    lo: UserId,
    hi: UserId,
}

impl ParticipantPair {
    /// Normalize two participants into canonical order.
    ///
    /// Fails when both sides are the same user, since a conversation needs
    /// two distinct participants.
    pub fn new(a: UserId, b: UserId) -> Result<Self, SharedError> {
        if a == b {
            return Err(SharedError::validation(
                "receiver_id",
                "a conversation needs two distinct participants",
            ));
        }
        Ok(Self {
            lo: a.min(b),
            hi: a.max(b),
        })
    }

    /// Lower participant id
    pub fn lo(&self) -> UserId {
        self.lo
    }

    /// Higher participant id
    pub fn hi(&self) -> UserId {
        self.hi
    }

    /// Check if user is one of the two participants
    pub fn contains(&self, user_id: UserId) -> bool {
        self.lo == user_id || self.hi == user_id
    }
}

/// A persisted conversation between two users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,
    /// Lower participant id (canonical order)
    pub user1_id: UserId,
    /// Higher participant id (canonical order)
    pub user2_id: UserId,
    /// Timestamp of the last message, if any was sent yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// The canonical participant pair of this conversation
    pub fn pair(&self) -> ParticipantPair {
        ParticipantPair {
            lo: self.user1_id,
            hi: self.user2_id,
        }
    }

    /// Check if user is a participant
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.pair().contains(user_id)
    }
}

/// Conversation row as listed for one participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user1_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user2_name: Option<String>,
    /// Messages addressed to the caller that are still unread
    pub unread_count: i64,
    /// Body of the most recent message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

/// Request to open (resolve or create) a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenConversationRequest {
    pub other_user_id: UserId,
}
