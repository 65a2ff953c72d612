pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::guard::handlers as guard;
use crate::identity::handlers as identity;
use crate::onboarding::handlers as onboarding;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Identity
        .route("/api/v1/auth/register", post(identity::handle_register))
        .route("/api/v1/auth/sign-in", post(identity::handle_sign_in))
        .route(
            "/api/v1/auth/oauth/callback",
            post(identity::handle_oauth_callback),
        )
        .route("/api/v1/auth/link", post(identity::handle_link))
        .route("/api/v1/auth/logout", post(identity::handle_logout))
        .route("/api/v1/auth/session", get(identity::handle_session))
        // Onboarding
        .route(
            "/api/v1/onboarding/destination",
            get(onboarding::handle_destination),
        )
        .route("/api/v1/onboarding/role", put(onboarding::handle_assign_role))
        .route(
            "/api/v1/onboarding/job-seeker-profile",
            put(onboarding::handle_job_seeker_profile),
        )
        .route(
            "/api/v1/onboarding/employer-profile",
            put(onboarding::handle_employer_profile),
        )
        .route("/api/v1/onboarding/skip", post(onboarding::handle_skip))
        // Route guard
        .route("/api/v1/guard", get(guard::handle_guard))
        .with_state(state)
}
