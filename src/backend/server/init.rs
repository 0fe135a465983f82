/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including store selection, hub startup, and route configuration.
 *
 * # Initialization Process
 *
 * 1. Load the database (if configured) and run migrations
 * 2. Pick the PostgreSQL store, or the in-process store without a database
 * 3. Start the real-time hub
 * 4. Create and configure the router
 */
use std::sync::Arc;

use axum::Router;

use crate::backend::messaging::{ChatStore, MemoryChatStore, PgChatStore};
use crate::backend::realtime::Hub;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;

/// Start the hub and assemble the application state around `store`
pub fn build_state(mut config: ServerConfig, store: Arc<dyn ChatStore>) -> AppState {
    config.hub = config.hub.sanitized();
    AppState {
        hub: Hub::spawn(),
        store,
        config: Arc::new(config),
    }
}

/// Create and configure the Axum application
///
/// # Error Handling
///
/// The function is designed to be resilient:
/// - Missing or unreachable database: the server runs on the in-process store
/// - Migration failures: same as a missing database
pub async fn create_app(config: ServerConfig) -> Router<()> {
    tracing::info!("Initializing messaging server");

    let store: Arc<dyn ChatStore> = match load_database(config.database_url.as_deref()).await {
        Some(pool) => Arc::new(PgChatStore::new(pool)),
        None => {
            tracing::warn!("Using the in-memory chat store; messages are lost on restart");
            Arc::new(MemoryChatStore::new())
        }
    };

    let app_state = build_state(config, store);
    let app = create_router(app_state);

    tracing::info!("Router configured");
    app
}
