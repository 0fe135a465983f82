//! Server Module
//!
//! This module contains all server-side code for initializing and configuring
//! the Axum HTTP server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Configuration loading (environment, database)
//! └── init.rs         - Server initialization and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::from_env`
//! 2. **Store Selection**: PostgreSQL when reachable, in-memory otherwise
//! 3. **Hub Startup**: the real-time hub task is spawned
//! 4. **Router Creation**: routes, authentication, CORS and tracing layers
//!
//! # Example
//!
//! ```rust,no_run
//! use saas_manager::backend::server::{config::ServerConfig, create_app};
//!
//! # async fn example() {
//! let app = create_app(ServerConfig::from_env()).await;
//! # }
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::{HubConfig, ServerConfig};
pub use init::{build_state, create_app};
pub use state::AppState;
