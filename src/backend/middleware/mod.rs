//! Middleware Module
//!
//! HTTP middleware for the backend server.
//!
//! - **`auth`** - Authentication middleware for protecting routes

pub mod auth;

pub use auth::{auth_middleware, AuthUser, AuthenticatedUser};
