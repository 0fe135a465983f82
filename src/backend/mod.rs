//! Backend Module
//!
//! This module contains all server-side code: the Axum HTTP server, the
//! real-time messaging hub, the durable chat store and identity resolution.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`realtime`** - WebSocket hub, connections and presence
//! - **`messaging`** - Chat store (PostgreSQL or in-memory) and REST handlers
//! - **`auth`** - JWT identity resolution
//! - **`middleware`** - Request authentication
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── realtime/       - Hub and connections
//! ├── messaging/      - Store and REST handlers
//! ├── auth/           - Identity tokens
//! ├── middleware/     - Request middleware
//! └── error/          - Error types
//! ```
//!
//! # Concurrency
//!
//! - The hub owns the connection registry inside a single task; everyone
//!   else talks to it through `HubHandle`
//! - Each connection runs one reader task and one writer task
//! - The store is shared as `Arc<dyn ChatStore>`

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Real-time messaging
pub mod realtime;

/// Backend error types
pub mod error;

/// Identity resolution
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// Conversations and messages
pub mod messaging;

pub use error::BackendError;
pub use server::create_app;
