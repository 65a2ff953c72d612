//! Route guard: maps a URL path to its access requirement and decides,
//! together with the onboarding router, whether a caller may proceed.

pub mod handlers;
pub mod table;

use serde::Serialize;

use crate::models::session::SessionClaims;
use crate::onboarding::router::{resolve_destination, Destination, OnboardingStage, OnboardingState};
use crate::store::PrincipalStore;

pub use table::{normalize_path, required_access, Requirement};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    Redirect { destination: Destination },
    Forbidden,
}

impl GuardDecision {
    pub fn location(&self) -> Option<&'static str> {
        match self {
            GuardDecision::Redirect { destination } => Some(destination.path()),
            _ => None,
        }
    }
}

/// Pure access decision for a path given the caller's onboarding state.
///
/// The caller's current onboarding destination is always reachable. Until
/// onboarding is done every other protected path redirects there.
pub fn evaluate(path: &str, state: &OnboardingState) -> GuardDecision {
    let requirement = required_access(path);
    if requirement == Requirement::Public {
        return GuardDecision::Allow;
    }

    let redirect = GuardDecision::Redirect {
        destination: state.destination,
    };
    match state.stage {
        OnboardingStage::Unauthenticated => GuardDecision::Redirect {
            destination: Destination::SignIn,
        },
        _ if normalize_path(path) == state.destination.path() => GuardDecision::Allow,
        OnboardingStage::RoleUnassigned | OnboardingStage::ProfileIncomplete(_) => redirect,
        OnboardingStage::ProfileComplete(role) => match requirement {
            Requirement::Public | Requirement::Authenticated => GuardDecision::Allow,
            Requirement::RoleDispatch | Requirement::OnboardingScreen => redirect,
            Requirement::Role(required) if required == role => GuardDecision::Allow,
            Requirement::Role(_) => GuardDecision::Forbidden,
        },
    }
}

/// Resolves the caller's onboarding state (fail-closed on store errors) and
/// evaluates the path. Public paths never touch the store.
pub async fn authorize(
    store: &dyn PrincipalStore,
    path: &str,
    claims: Option<&SessionClaims>,
) -> GuardDecision {
    if required_access(path) == Requirement::Public {
        return GuardDecision::Allow;
    }
    let state = resolve_destination(store, claims).await;
    evaluate(path, &state)
}
