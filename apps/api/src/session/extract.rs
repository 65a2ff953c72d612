use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use sha2::{Digest, Sha256};

use crate::errors::AppError;
use crate::models::session::SessionClaims;
use crate::state::AppState;

pub const ADAPTER_KEY_HEADER: &str = "x-identity-adapter-key";

/// Claims of the caller's session, read from `Authorization: Bearer <token>`.
///
/// Use `Option<AuthSession>` on routes that also serve anonymous callers.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        state
            .sessions
            .read(state.store.as_ref(), token)
            .await
            .map(AuthSession)
    }
}

/// Proof that the request came from the OAuth adapter, which has already
/// completed the provider exchange and vouches for the identity it posts.
#[derive(Debug, Clone, Copy)]
pub struct AdapterAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdapterAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADAPTER_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        // Compare digests so the comparison length never depends on the input.
        let expected = Sha256::digest(state.config.identity_adapter_key.as_bytes());
        if Sha256::digest(presented.as_bytes()) != expected {
            return Err(AppError::Unauthorized);
        }
        Ok(AdapterAuth)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
