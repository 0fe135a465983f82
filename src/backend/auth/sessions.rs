/**
 * Identity Tokens
 *
 * This module handles JWT token generation and validation. Tokens are issued
 * elsewhere; the server only needs to verify them and turn the claims into an
 * `Identity` for the real-time hub and the REST handlers.
 */
use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::messaging::UserId;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID as a decimal string
    pub sub: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Role (optional, not used for authorization here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing credential")]
    MissingCredential,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid subject in token: {0}")]
    InvalidSubject(String),
}

/// Who is on the other end of a request or connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Create a JWT token for a user
///
/// # Arguments
/// * `secret` - HMAC secret
/// * `user_id` - User ID
/// * `name` - Display name carried in the token
/// * `ttl` - How long the token stays valid
pub fn create_token(
    secret: &str,
    user_id: UserId,
    name: &str,
    ttl: Duration,
) -> Result<String, AuthError> {
    let now = now_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        role: None,
        exp: now + ttl.as_secs(),
        iat: now,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
}

/// Verify and decode a JWT token
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Ok(token_data.claims)
}

/// Resolve a credential into the caller's identity
pub fn resolve_identity(secret: &str, token: &str) -> Result<Identity, AuthError> {
    let claims = verify_token(secret, token)?;
    let user_id = claims
        .sub
        .parse::<UserId>()
        .map_err(|e| AuthError::InvalidSubject(format!("{}: {}", claims.sub, e)))?;

    Ok(Identity {
        user_id,
        display_name: claims.name,
    })
}
