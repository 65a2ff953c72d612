use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::identity::linking::{link_provider, ProviderLink};
use crate::identity::reconcile::{
    register, resolve_identity, AuthEvent, OAuthIdentity, Registration,
};
use crate::models::session::SessionClaims;
use crate::onboarding::router::{resolve_destination, OnboardingState};
use crate::session::{AdapterAuth, AuthSession, SessionResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub claims: SessionClaims,
    pub onboarding: OnboardingState,
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let Json(req) = payload?;
    let auth = register(state.store.as_ref(), &state.sessions, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(auth.session, &auth.principal)),
    ))
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Json(req) = payload?;
    let event = AuthEvent::Credential {
        email: req.email,
        password: req.password,
    };
    let auth = resolve_identity(state.store.as_ref(), &state.sessions, event).await?;
    Ok(Json(SessionResponse::new(auth.session, &auth.principal)))
}

/// POST /api/v1/auth/oauth/callback
///
/// Called by the OAuth adapter once the provider exchange has succeeded.
pub async fn handle_oauth_callback(
    State(state): State<AppState>,
    _adapter: AdapterAuth,
    payload: Result<Json<OAuthIdentity>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Json(identity) = payload?;
    let auth = resolve_identity(
        state.store.as_ref(),
        &state.sessions,
        AuthEvent::OAuth(identity),
    )
    .await?;
    Ok(Json(SessionResponse::new(auth.session, &auth.principal)))
}

/// POST /api/v1/auth/link
///
/// Adapter-vouched provider identity plus the user's own session. The
/// session presented is replaced by a fresh one.
pub async fn handle_link(
    State(state): State<AppState>,
    _adapter: AdapterAuth,
    AuthSession(claims): AuthSession,
    payload: Result<Json<ProviderLink>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Json(link) = payload?;
    let principal = link_provider(state.store.as_ref(), &claims, link).await?;
    let session = state.sessions.issue(&principal)?;
    state.sessions.revoke(state.store.as_ref(), &claims).await?;
    Ok(Json(SessionResponse::new(session, &principal)))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<StatusCode, AppError> {
    state.sessions.revoke(state.store.as_ref(), &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/session
pub async fn handle_session(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Json<SessionInfo> {
    let onboarding = resolve_destination(state.store.as_ref(), Some(&claims)).await;
    Json(SessionInfo { claims, onboarding })
}
