//! Inbound event handling for one connection
//!
//! Typing indicators are rebroadcast as-is and never persisted. Chat messages
//! are persisted first and broadcast only once the store has accepted them;
//! when the store fails the message is dropped and logged, and the sender
//! gets no error frame.

use std::sync::Arc;

use super::hub::{ConnectionId, HubHandle};
use crate::backend::messaging::{deliver_chat_message, ChatStore};
use crate::shared::error::SharedError;
use crate::shared::event::{ClientEvent, ServerEvent, TypingEvent};
use crate::shared::messaging::{ParticipantPair, UserId};

/// Everything an inbound frame needs to be acted on
#[derive(Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub display_name: String,
    pub hub: HubHandle,
    pub store: Arc<dyn ChatStore>,
}

/// Act on one decoded event
///
/// Returns an error only when the event itself is invalid for this sender,
/// which the caller counts like an undecodable frame.
pub async fn dispatch(session: &Session, event: ClientEvent) -> Result<(), SharedError> {
    match event {
        ClientEvent::Typing {
            receiver_id,
            is_typing,
        } => {
            let event = ServerEvent::Typing(TypingEvent {
                sender_id: session.user_id,
                receiver_id,
                is_typing,
            });
            publish(session, event).await;
        }
        ClientEvent::Chat {
            receiver_id,
            message,
            message_type,
        } => {
            ParticipantPair::new(session.user_id, receiver_id)?;

            match deliver_chat_message(
                session.store.as_ref(),
                session.user_id,
                &session.display_name,
                receiver_id,
                message,
                message_type,
            )
            .await
            {
                Ok(stored) => {
                    tracing::debug!(
                        "Message {} from user {} to user {} stored",
                        stored.id,
                        stored.sender_id,
                        stored.receiver_id
                    );
                    publish(session, ServerEvent::Message(stored)).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Dropping message from user {} to user {}: {:?}",
                        session.user_id,
                        receiver_id,
                        e
                    );
                }
            }
        }
    }
    Ok(())
}

async fn publish(session: &Session, event: ServerEvent) {
    if let Err(e) = session.hub.broadcast(event).await {
        tracing::warn!(
            "Connection {} could not publish event: {}",
            session.connection_id,
            e
        );
    }
}
