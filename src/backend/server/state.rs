/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct holds:
 * - A handle to the real-time hub (the hub's state lives in its own task)
 * - The durable chat store
 * - The server configuration
 *
 * Every field is cheap to clone, so handlers can extract just the part
 * they need with `State<T>`.
 */
use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::messaging::ChatStore;
use crate::backend::realtime::HubHandle;
use crate::backend::server::config::ServerConfig;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Request queue of the real-time hub
    pub hub: HubHandle,

    /// Durable store for conversations and messages
    pub store: Arc<dyn ChatStore>,

    /// Configuration the server was started with
    pub config: Arc<ServerConfig>,
}

impl FromRef<AppState> for HubHandle {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ChatStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
