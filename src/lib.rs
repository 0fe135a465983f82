//! SaaS Manager - Messaging Core
//!
//! Back office server for a multi-tenant SaaS manager. Its core is a real-time
//! messaging hub: authenticated users hold WebSocket connections, exchange
//! one-to-one chat messages and typing indicators, and see who is online.
//! Messages are persisted before they are fanned out.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and clients
//!   - Participant pair, conversation and message models
//!   - Real-time wire protocol (`ClientEvent`, `ServerEvent`)
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server and WebSocket endpoint
//!   - Hub, connections and presence
//!   - PostgreSQL or in-memory chat store
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - Enables the `backend` module and the server binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use saas_manager::backend::server::{create_app, ServerConfig};
//!
//! # async fn example() {
//! let app = create_app(ServerConfig::from_env()).await;
//! // Use app with axum::serve
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
