//! Authentication Module
//!
//! Identity resolution for the server. Tokens are issued by the account
//! service; this module verifies them and yields the caller's `Identity`.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! └── sessions.rs     - JWT token management
//! ```
//!
//! # Flow
//!
//! 1. Client presents `Authorization: Bearer <token>` (or `?token=` on WebSocket upgrades)
//! 2. `auth_middleware` calls `resolve_identity`
//! 3. Handlers receive the caller through the `AuthUser` extractor

/// JWT token generation and validation
pub mod sessions;

pub use sessions::{create_token, resolve_identity, verify_token, AuthError, Claims, Identity};
