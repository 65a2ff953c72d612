use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::principal::PrincipalView;
use crate::onboarding::profile::{
    complete_employer_profile, complete_job_seeker_profile, skip_questionnaire,
};
use crate::onboarding::roles::assign_role;
use crate::onboarding::router::{next, resolve_destination, Destination, OnboardingState};
use crate::onboarding::validation::{EmployerAnswers, JobSeekerAnswers};
use crate::session::{AuthSession, SessionResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub principal: PrincipalView,
    pub onboarding: OnboardingState,
}

#[derive(Debug, Serialize)]
pub struct SkipResponse {
    pub principal: PrincipalView,
    pub destination: Destination,
}

/// GET /api/v1/onboarding/destination
pub async fn handle_destination(
    State(state): State<AppState>,
    session: Option<AuthSession>,
) -> Json<OnboardingState> {
    let claims = session.map(|AuthSession(claims)| claims);
    Json(resolve_destination(state.store.as_ref(), claims.as_ref()).await)
}

/// PUT /api/v1/onboarding/role
///
/// Returns a refreshed session carrying the new role; the old one is revoked.
pub async fn handle_assign_role(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Json(req) = payload?;
    let principal = assign_role(state.store.as_ref(), claims.principal_id(), &req.role).await?;
    let session = state.sessions.issue(&principal)?;
    state.sessions.revoke(state.store.as_ref(), &claims).await?;
    Ok(Json(SessionResponse::new(session, &principal)))
}

/// PUT /api/v1/onboarding/job-seeker-profile
pub async fn handle_job_seeker_profile(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    payload: Result<Json<JobSeekerAnswers>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(answers) = payload?;
    let principal =
        complete_job_seeker_profile(state.store.as_ref(), claims.principal_id(), &answers).await?;
    Ok(Json(ProfileResponse {
        onboarding: next(Some(&principal)),
        principal: PrincipalView::from(&principal),
    }))
}

/// PUT /api/v1/onboarding/employer-profile
pub async fn handle_employer_profile(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
    payload: Result<Json<EmployerAnswers>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(answers) = payload?;
    let principal =
        complete_employer_profile(state.store.as_ref(), claims.principal_id(), &answers).await?;
    Ok(Json(ProfileResponse {
        onboarding: next(Some(&principal)),
        principal: PrincipalView::from(&principal),
    }))
}

/// POST /api/v1/onboarding/skip
pub async fn handle_skip(
    State(state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<Json<SkipResponse>, AppError> {
    let (principal, destination) =
        skip_questionnaire(state.store.as_ref(), claims.principal_id()).await?;
    Ok(Json(SkipResponse {
        principal: PrincipalView::from(&principal),
        destination,
    }))
}
