//! Messaging Module
//!
//! Durable storage for one-to-one chat and its REST endpoints.
//!
//! - **`store`** - `ChatStore` trait and `StoreError`
//! - **`db`** - PostgreSQL implementation
//! - **`memory`** - In-process implementation
//! - **`delivery`** - Persisting a chat message end to end
//! - **`handlers`** - HTTP handlers under `/api/messages`

pub mod db;
pub mod delivery;
pub mod handlers;
pub mod memory;
pub mod store;

pub use db::PgChatStore;
pub use delivery::deliver_chat_message;
pub use memory::MemoryChatStore;
pub use store::{ChatStore, StoreError};
