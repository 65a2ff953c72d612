use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::principal::{Principal, Role};
use crate::onboarding::router::Destination;
use crate::onboarding::validation::{
    validate_employer, validate_job_seeker, EmployerAnswers, JobSeekerAnswers,
};
use crate::store::{PrincipalStore, Questionnaire};

async fn load(store: &dyn PrincipalStore, principal_id: Uuid) -> Result<Principal, AppError> {
    store
        .find_by_id(principal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Principal {principal_id} not found")))
}

fn require_role(principal: &Principal, role: Role) -> Result<(), AppError> {
    if principal.role == role {
        Ok(())
    } else {
        Err(AppError::InvalidRole(format!(
            "this questionnaire is for {role} accounts; current role is {}",
            principal.role
        )))
    }
}

/// Validates and stores job-seeker answers, marking the profile completed.
/// Re-submitting overwrites earlier answers.
pub async fn complete_job_seeker_profile(
    store: &dyn PrincipalStore,
    principal_id: Uuid,
    answers: &JobSeekerAnswers,
) -> Result<Principal, AppError> {
    let profile = validate_job_seeker(answers)?;
    let principal = load(store, principal_id).await?;
    require_role(&principal, Role::JobSeeker)?;

    let updated = store.save_job_seeker_profile(principal_id, profile).await?;
    info!("Principal {principal_id} completed job-seeker profile");
    Ok(updated)
}

pub async fn complete_employer_profile(
    store: &dyn PrincipalStore,
    principal_id: Uuid,
    answers: &EmployerAnswers,
) -> Result<Principal, AppError> {
    let profile = validate_employer(answers)?;
    let principal = load(store, principal_id).await?;
    require_role(&principal, Role::Employer)?;

    let updated = store.save_employer_profile(principal_id, profile).await?;
    info!("Principal {principal_id} completed employer profile");
    Ok(updated)
}

/// Voluntary skip: routes to the role dashboard and records the skip so later
/// visits are not re-prompted. `completed` is left as it was.
pub async fn skip_questionnaire(
    store: &dyn PrincipalStore,
    principal_id: Uuid,
) -> Result<(Principal, Destination), AppError> {
    let principal = load(store, principal_id).await?;
    let questionnaire = match principal.role {
        Role::JobSeeker => Questionnaire::JobSeeker,
        Role::Employer => Questionnaire::Employer,
        Role::Admin => return Ok((principal, Destination::AdminDashboard)),
        Role::Unassigned => {
            return Err(AppError::InvalidRole(
                "choose a role before skipping the questionnaire".to_string(),
            ))
        }
    };

    let updated = store.mark_skipped(principal_id, questionnaire).await?;
    info!("Principal {principal_id} skipped the {} questionnaire", updated.role);
    let destination = Destination::dashboard_for(updated.role);
    Ok((updated, destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::principal::{ExperienceLevel, FieldOfInterest, NewPrincipal};
    use crate::onboarding::router::next;
    use crate::store::MemoryPrincipalStore;

    async fn seed(store: &MemoryPrincipalStore, role: Role) -> Principal {
        store
            .create(NewPrincipal {
                email: format!("{}@x.com", Uuid::new_v4()),
                name: "P".to_string(),
                credential_secret: None,
                role,
                verified: false,
                linked_provider: None,
            })
            .await
            .unwrap()
    }

    fn answers(level: &str, field: &str) -> JobSeekerAnswers {
        JobSeekerAnswers {
            experience_level: level.to_string(),
            field_of_interest: field.to_string(),
        }
    }

    #[tokio::test]
    async fn test_completion_moves_job_seeker_to_dashboard() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::JobSeeker).await;
        assert_eq!(next(Some(&p)).destination, Destination::JobSeekerQuestionnaire);

        let updated = complete_job_seeker_profile(&store, p.id, &answers("student", "design"))
            .await
            .unwrap();
        assert!(updated.job_seeker_profile.as_ref().unwrap().completed);
        assert_eq!(next(Some(&updated)).destination, Destination::JobSeekerDashboard);
    }

    #[tokio::test]
    async fn test_resubmission_overwrites() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::JobSeeker).await;
        complete_job_seeker_profile(&store, p.id, &answers("student", "design"))
            .await
            .unwrap();
        let updated = complete_job_seeker_profile(&store, p.id, &answers("experienced", "finance"))
            .await
            .unwrap();
        let profile = updated.job_seeker_profile.unwrap();
        assert!(profile.completed);
        assert_eq!(profile.experience_level, Some(ExperienceLevel::Experienced));
        assert_eq!(profile.field_of_interest, Some(FieldOfInterest::Finance));
    }

    #[tokio::test]
    async fn test_invalid_answers_leave_profile_untouched() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::JobSeeker).await;
        let err = complete_job_seeker_profile(&store, p.id, &answers("expert", "design"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "experience_level"));
        let stored = store.find_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(stored.job_seeker_profile, None);
    }

    #[tokio::test]
    async fn test_questionnaire_must_match_role() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::Employer).await;
        let err = complete_job_seeker_profile(&store, p.id, &answers("student", "design"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRole(_)));
    }

    #[tokio::test]
    async fn test_employer_completion() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::Employer).await;
        let updated = complete_employer_profile(
            &store,
            p.id,
            &EmployerAnswers {
                company_name: "Acme".to_string(),
                company_size: "11-50".to_string(),
                industry: "engineering".to_string(),
                company_website: None,
            },
        )
        .await
        .unwrap();
        assert!(updated.employer_profile.as_ref().unwrap().completed);
        assert_eq!(next(Some(&updated)).destination, Destination::EmployerDashboard);
    }

    #[tokio::test]
    async fn test_skip_reaches_dashboard_and_keeps_completed_false() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::JobSeeker).await;

        let (updated, destination) = skip_questionnaire(&store, p.id).await.unwrap();
        assert_eq!(destination, Destination::JobSeekerDashboard);
        assert!(!updated.job_seeker_profile.as_ref().unwrap().completed);

        // Subsequent visit is not re-prompted.
        let reloaded = store.find_by_id(p.id).await.unwrap();
        assert_eq!(
            next(reloaded.as_ref()).destination,
            Destination::JobSeekerDashboard
        );
    }

    #[tokio::test]
    async fn test_skip_then_complete_later() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::JobSeeker).await;
        skip_questionnaire(&store, p.id).await.unwrap();
        let updated = complete_job_seeker_profile(&store, p.id, &answers("fresher", "sales"))
            .await
            .unwrap();
        assert!(updated.job_seeker_profile.unwrap().completed);
    }

    #[tokio::test]
    async fn test_skip_requires_role() {
        let store = MemoryPrincipalStore::new();
        let p = seed(&store, Role::Unassigned).await;
        assert!(matches!(
            skip_questionnaire(&store, p.id).await.unwrap_err(),
            AppError::InvalidRole(_)
        ));

        let admin = seed(&store, Role::Admin).await;
        let (unchanged, destination) = skip_questionnaire(&store, admin.id).await.unwrap();
        assert_eq!(destination, Destination::AdminDashboard);
        assert_eq!(unchanged.job_seeker_profile, None);
    }
}
