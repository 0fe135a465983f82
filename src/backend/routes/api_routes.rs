/**
 * API Routes
 *
 * # Routes
 *
 * ## Messaging
 * - `POST /api/messages/conversations` - Open a conversation with another user
 * - `GET /api/messages/conversations` - List the caller's conversations
 * - `GET /api/messages/conversations/{id}/messages` - Messages of a conversation
 * - `POST /api/messages/send` - Persist a message
 * - `GET /api/messages/unread-count` - Unread counter
 * - `GET /api/messages/online-users` - Presence snapshot
 *
 * ## Real-time
 * - `GET /api/ws` - WebSocket upgrade
 *
 * Every route here requires authentication; the caller applies
 * `auth_middleware` to the returned router.
 */
use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::messaging::handlers::{
    get_messages, list_conversations, online_users, open_conversation, send_message,
    unread_count,
};
use crate::backend::realtime::ws_handler;
use crate::backend::server::state::AppState;

/// Configure the authenticated API routes
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/messages/conversations",
            post(open_conversation).get(list_conversations),
        )
        .route(
            "/api/messages/conversations/{conversation_id}/messages",
            get(get_messages),
        )
        .route("/api/messages/send", post(send_message))
        .route("/api/messages/unread-count", get(unread_count))
        .route("/api/messages/online-users", get(online_users))
        .route("/api/ws", get(ws_handler))
}
