use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::guard::{authorize, GuardDecision};
use crate::session::AuthSession;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GuardQuery {
    pub path: String,
}

#[derive(Serialize)]
pub struct GuardResponse {
    pub path: String,
    #[serde(flatten)]
    pub decision: GuardDecision,
    pub location: Option<&'static str>,
}

/// GET /api/v1/guard?path=/employer/jobs
pub async fn handle_guard(
    State(state): State<AppState>,
    session: Option<AuthSession>,
    Query(params): Query<GuardQuery>,
) -> Json<GuardResponse> {
    let claims = session.map(|AuthSession(claims)| claims);
    let decision = authorize(state.store.as_ref(), &params.path, claims.as_ref()).await;
    Json(GuardResponse {
        location: decision.location(),
        path: params.path,
        decision,
    })
}
