//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the server and its clients. These types are used for serialization over
//! the REST API and the real-time WebSocket protocol.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. All types are designed for serialization
//! and transmission over HTTP.

/// Real-time wire protocol
pub mod event;

/// Shared error types
pub mod error;

/// Conversation and message types
pub mod messaging;

/// Re-export commonly used types for convenience
pub use error::SharedError;
pub use event::{ClientEvent, ServerEvent, TypingEvent};
pub use messaging::{ChatMessage, Conversation, ParticipantPair, UserId};
