//! Onboarding router: decides the single correct next screen for a principal.
//!
//! `next` is a pure function of a principal snapshot. `resolve_destination`
//! loads a fresh snapshot per call and applies the fail-closed policy when the
//! store cannot be read. Nothing here is cached across requests.
//!
//! Stages, in order:
//! `Unauthenticated → RoleUnassigned → RoleSelected(role) → ProfileIncomplete(role) → ProfileComplete(role)`.
//! `RoleSelected` only exists between `assign_role` and the next evaluation,
//! which always resolves it to one of the profile stages.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::principal::{Principal, Role};
use crate::models::session::SessionClaims;
use crate::store::{PrincipalStore, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "stage", content = "role", rename_all = "snake_case")]
pub enum OnboardingStage {
    Unauthenticated,
    RoleUnassigned,
    ProfileIncomplete(Role),
    ProfileComplete(Role),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    SignIn,
    RoleSelection,
    JobSeekerQuestionnaire,
    EmployerQuestionnaire,
    JobSeekerDashboard,
    EmployerDashboard,
    AdminDashboard,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::SignIn => "/login",
            Destination::RoleSelection => "/select-role",
            Destination::JobSeekerQuestionnaire => "/jobseeker/questionnaire",
            Destination::EmployerQuestionnaire => "/employer/questionnaire",
            Destination::JobSeekerDashboard => "/jobseeker/dashboard",
            Destination::EmployerDashboard => "/employer/dashboard",
            Destination::AdminDashboard => "/admin/dashboard",
        }
    }

    /// Dashboard for a role that has finished (or skipped) onboarding.
    pub fn dashboard_for(role: Role) -> Destination {
        match role {
            Role::JobSeeker => Destination::JobSeekerDashboard,
            Role::Employer => Destination::EmployerDashboard,
            Role::Admin => Destination::AdminDashboard,
            Role::Unassigned => Destination::RoleSelection,
        }
    }
}

/// Derived classification of how far a principal has progressed.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct OnboardingState {
    #[serde(flatten)]
    pub stage: OnboardingStage,
    pub needs_role_selection: bool,
    pub needs_job_seeker_questionnaire: bool,
    pub needs_employer_questionnaire: bool,
    pub destination: Destination,
}

impl OnboardingState {
    fn at(stage: OnboardingStage) -> Self {
        let destination = match stage {
            OnboardingStage::Unauthenticated => Destination::SignIn,
            OnboardingStage::RoleUnassigned => Destination::RoleSelection,
            OnboardingStage::ProfileIncomplete(Role::Employer) => Destination::EmployerQuestionnaire,
            OnboardingStage::ProfileIncomplete(_) => Destination::JobSeekerQuestionnaire,
            OnboardingStage::ProfileComplete(role) => Destination::dashboard_for(role),
        };
        OnboardingState {
            stage,
            needs_role_selection: stage == OnboardingStage::RoleUnassigned,
            needs_job_seeker_questionnaire: stage
                == OnboardingStage::ProfileIncomplete(Role::JobSeeker),
            needs_employer_questionnaire: stage
                == OnboardingStage::ProfileIncomplete(Role::Employer),
            destination,
        }
    }
}

/// The transition function. Role assignment is evaluated before profile
/// completeness. A questionnaire the user chose to skip counts as done for
/// routing purposes while its `completed` flag stays false.
pub fn next(snapshot: Option<&Principal>) -> OnboardingState {
    let Some(principal) = snapshot else {
        return OnboardingState::at(OnboardingStage::Unauthenticated);
    };

    let stage = match principal.role {
        Role::Admin => OnboardingStage::ProfileComplete(Role::Admin),
        Role::Unassigned => OnboardingStage::RoleUnassigned,
        Role::Employer => {
            let done = principal
                .employer_profile
                .as_ref()
                .is_some_and(|p| p.completed || p.skipped);
            if done {
                OnboardingStage::ProfileComplete(Role::Employer)
            } else {
                OnboardingStage::ProfileIncomplete(Role::Employer)
            }
        }
        Role::JobSeeker => {
            let done = principal
                .job_seeker_profile
                .as_ref()
                .is_some_and(|p| p.completed || p.skipped);
            if done {
                OnboardingStage::ProfileComplete(Role::JobSeeker)
            } else {
                OnboardingStage::ProfileIncomplete(Role::JobSeeker)
            }
        }
    };

    OnboardingState::at(stage)
}

/// Loads the principal behind the session and runs `next` on it.
///
/// Store failures fail closed to `RoleUnassigned`: over-prompting for role
/// selection is preferred to granting dashboard access on a guess.
pub async fn resolve_destination(
    store: &dyn PrincipalStore,
    claims: Option<&SessionClaims>,
) -> OnboardingState {
    let Some(claims) = claims else {
        return next(None);
    };

    match store.find_by_id(claims.principal_id()).await {
        Ok(snapshot) => next(snapshot.as_ref()),
        Err(StoreError::NotFound) => next(None),
        Err(e) => {
            warn!(
                "Onboarding lookup failed for principal {}: {e}; failing closed to role selection",
                claims.principal_id()
            );
            OnboardingState::at(OnboardingStage::RoleUnassigned)
        }
    }
}
