use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::principal::{normalize_email, LinkedProvider, Principal};
use crate::models::session::SessionClaims;
use crate::store::{PrincipalStore, StoreError};

/// Provider identity to attach to the signed-in principal.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderLink {
    pub provider_name: String,
    pub provider_subject_id: String,
    pub provider_email: String,
}

/// Explicit account linking. Only allowed from an active session, and only
/// when the provider's email is the session's email. On success the
/// principal is marked verified.
pub async fn link_provider(
    store: &dyn PrincipalStore,
    claims: &SessionClaims,
    link: ProviderLink,
) -> Result<Principal, AppError> {
    let provider_name = link.provider_name.trim().to_lowercase();
    let subject = link.provider_subject_id.trim().to_string();
    if provider_name.is_empty() {
        return Err(AppError::validation("provider_name", "must not be empty"));
    }
    if subject.is_empty() {
        return Err(AppError::validation("provider_subject_id", "must not be empty"));
    }

    let provider_email = normalize_email(&link.provider_email);
    if provider_email != claims.email {
        warn!(
            "Refusing to link {provider_name} to principal {}: provider email differs from session email",
            claims.sub
        );
        return Err(AppError::EmailMismatch);
    }

    let principal = store
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Principal {} not found", claims.sub)))?;
    if principal.email != claims.email {
        return Err(AppError::EmailMismatch);
    }

    if let Some(existing) = principal.linked_provider(&provider_name) {
        return if existing.provider_subject_id == subject {
            Ok(principal)
        } else {
            Err(AppError::ProviderAlreadyLinked)
        };
    }

    let updated = store
        .link_provider(
            principal.id,
            LinkedProvider {
                provider_name: provider_name.clone(),
                provider_subject_id: subject,
                provider_email,
                linked_at: Utc::now(),
            },
        )
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::ProviderAlreadyLinked,
            other => other.into(),
        })?;

    info!("Linked {provider_name} to principal {}", updated.id);
    Ok(updated)
}
