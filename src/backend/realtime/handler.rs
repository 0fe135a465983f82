//! WebSocket upgrade endpoint
//!
//! The caller is already authenticated by `auth_middleware`; this handler
//! only configures the transport and hands the socket to the connection
//! lifecycle.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use super::connection;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;

/// Hard cap enforced by the transport; the configured per-frame limit is
/// checked by the connection itself so oversize frames get a clear close reason
const TRANSPORT_FRAME_CEILING: usize = 64 * 1024;

/// Upgrade an authenticated request to a real-time connection
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Response {
    tracing::debug!("WebSocket upgrade requested by user {}", user.user_id);

    let config = state.config.hub.clone();
    let ceiling = TRANSPORT_FRAME_CEILING.max(config.max_message_bytes);

    ws.max_message_size(ceiling)
        .max_frame_size(ceiling)
        .on_failed_upgrade(|e| tracing::warn!("WebSocket upgrade failed: {:?}", e))
        .on_upgrade(move |socket| {
            connection::serve(socket, user, state.hub.clone(), state.store.clone(), config)
        })
}
