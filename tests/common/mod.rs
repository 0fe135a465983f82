//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - A live server on an ephemeral port, backed by the in-memory store
//! - WebSocket client helpers
//! - Authentication test helpers
//! - Custom assertion macros

#![allow(dead_code)]

pub mod assertions;
pub mod auth_helpers;
pub mod server;

pub use auth_helpers::*;
pub use server::*;
