//! Messaging HTTP Handlers
//!
//! REST access to conversations and messages. Every handler runs behind
//! `auth_middleware` and acts on behalf of the authenticated caller.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use super::delivery::deliver_chat_message;
use super::store::ChatStore;
use crate::backend::error::BackendError;
use crate::backend::middleware::AuthUser;
use crate::backend::realtime::HubHandle;
use crate::shared::messaging::{
    ChatMessage, ConversationId, ConversationSummary, MessageType, OpenConversationRequest,
    ParticipantPair, SendMessageRequest, UnreadCountResponse, UserId,
};

/// Open (resolve or create) the conversation with another user
pub async fn open_conversation(
    State(store): State<Arc<dyn ChatStore>>,
    AuthUser(user): AuthUser,
    Json(request): Json<OpenConversationRequest>,
) -> Result<Json<ConversationSummary>, BackendError> {
    let pair = ParticipantPair::new(user.user_id, request.other_user_id)?;
    let conversation = store.resolve_or_create_conversation(pair).await?;
    let conversation_id = conversation.id;

    // Reuse the listing so the response carries names and counters
    let summary = store
        .list_conversations(user.user_id)
        .await?
        .into_iter()
        .find(|summary| summary.conversation.id == conversation_id)
        .unwrap_or(ConversationSummary {
            conversation,
            user1_name: None,
            user2_name: None,
            unread_count: 0,
            last_message: None,
        });

    Ok(Json(summary))
}

/// List the caller's conversations, most recently active first
pub async fn list_conversations(
    State(store): State<Arc<dyn ChatStore>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ConversationSummary>>, BackendError> {
    let conversations = store.list_conversations(user.user_id).await?;
    Ok(Json(conversations))
}

/// Messages of one conversation, oldest first
///
/// Messages addressed to the caller are marked read once fetched.
pub async fn get_messages(
    State(store): State<Arc<dyn ChatStore>>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<ConversationId>,
) -> Result<Json<Vec<ChatMessage>>, BackendError> {
    store
        .find_conversation(conversation_id, user.user_id)
        .await?
        .ok_or_else(|| BackendError::not_found("Conversation not found"))?;

    let messages = store.list_messages(conversation_id).await?;

    match store
        .mark_conversation_read(conversation_id, user.user_id, Utc::now())
        .await
    {
        Ok(changed) if changed > 0 => {
            tracing::debug!(
                "Marked {} messages read in conversation {} for user {}",
                changed,
                conversation_id,
                user.user_id
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(
                "Failed to mark conversation {} read: {:?}",
                conversation_id,
                e
            );
        }
    }

    Ok(Json(messages))
}

/// Persist a message without pushing it to live connections
pub async fn send_message(
    State(store): State<Arc<dyn ChatStore>>,
    AuthUser(user): AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), BackendError> {
    if request.message.trim().is_empty() {
        return Err(BackendError::handler(
            StatusCode::BAD_REQUEST,
            "Message cannot be empty",
        ));
    }

    let stored = deliver_chat_message(
        store.as_ref(),
        user.user_id,
        &user.name,
        request.receiver_id,
        request.message,
        MessageType::from_tag(request.message_type.as_deref()),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Number of unread messages addressed to the caller
pub async fn unread_count(
    State(store): State<Arc<dyn ChatStore>>,
    AuthUser(user): AuthUser,
) -> Result<Json<UnreadCountResponse>, BackendError> {
    let count = store.unread_count(user.user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// Users with at least one live real-time connection
pub async fn online_users(
    State(hub): State<HubHandle>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<UserId>>, BackendError> {
    let snapshot = hub.snapshot().await.map_err(|e| {
        BackendError::handler(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;
    Ok(Json(snapshot.online_users()))
}
