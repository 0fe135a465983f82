//! Real-time Messaging Module
//!
//! WebSocket fan-out for chat messages, typing indicators and presence.
//!
//! # Architecture
//!
//! - **`hub`** - Single-task registry of live connections, broadcaster and presence tracker
//! - **`connection`** - Per-socket lifecycle: registration, history replay, reader and writer pumps
//! - **`dispatch`** - What to do with each decoded inbound event
//! - **`handler`** - Axum WebSocket upgrade endpoint
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── hub.rs          - Hub task and HubHandle
//! ├── connection.rs   - Connection pumps
//! ├── dispatch.rs     - Inbound event handling
//! └── handler.rs      - WebSocket upgrade handler
//! ```
//!
//! # Event Flow
//!
//! 1. Client connects to `GET /api/ws?token=...`
//! 2. The connection registers with the hub and receives `online_users` and `history`
//! 3. Inbound chat frames are persisted, then broadcast as `message` to every connection
//! 4. Inbound typing frames are broadcast as `typing` without touching storage
//! 5. On close the connection unregisters and everyone receives the new `online_users`

pub mod connection;
pub mod dispatch;
pub mod handler;
pub mod hub;

pub use connection::CloseReason;
pub use handler::ws_handler;
pub use hub::{ConnectionHandle, ConnectionId, Hub, HubError, HubHandle, HubSnapshot};
