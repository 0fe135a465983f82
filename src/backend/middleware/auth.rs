/**
 * Authentication Middleware
 *
 * This module provides middleware for protecting routes that require
 * user authentication. It extracts and verifies JWT tokens and provides
 * the caller's identity to handlers.
 *
 * The token is read from the `Authorization: Bearer <token>` header, or from
 * the `token` query parameter when the header is absent. Browsers cannot set
 * headers on a WebSocket upgrade, so the real-time endpoint relies on the
 * query parameter.
 */
use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::backend::auth::{resolve_identity, AuthError, Identity};
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::messaging::UserId;

/// Authenticated user data extracted from JWT token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub name: String,
}

impl From<Identity> for AuthenticatedUser {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.user_id,
            name: identity.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Find the credential on a request: bearer header first, then `?token=`
fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
///
/// This middleware:
/// 1. Extracts the JWT token from the Authorization header or query string
/// 2. Resolves it into the caller's identity
/// 3. Attaches `AuthenticatedUser` to request extensions for use in handlers
///
/// Returns 401 Unauthorized if token is missing or invalid
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let token = extract_token(request.headers(), request.uri()).ok_or_else(|| {
        tracing::warn!("Missing credential on {}", request.uri().path());
        AuthError::MissingCredential
    })?;

    let identity = resolve_identity(&app_state.config.jwt_secret, &token).map_err(|e| {
        tracing::warn!("Invalid token: {:?}", e);
        e
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(identity));

    Ok(next.run(request).await)
}

/// Axum extractor for authenticated user
///
/// This can be used as a parameter in handlers to automatically extract
/// the authenticated user from request extensions.
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("AuthenticatedUser not found in request extensions");
                AuthError::MissingCredential
            })?;

        Ok(AuthUser(user))
    }
}
