//! Identity reconciliation: resolves an authentication event to exactly one
//! principal.
//!
//! OAuth identities are never merged into an existing account automatically:
//! whoever controls an OAuth identity carrying a victim's email must not be
//! able to sign in as the victim. The owner signs in with their original
//! method and links the provider explicitly (see `identity::linking`).

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::identity::password::{hash_secret, verify_stored};
use crate::models::principal::{normalize_email, LinkedProvider, NewPrincipal, Principal, Role};
use crate::session::{IssuedSession, SessionIssuer};
use crate::store::{PrincipalStore, StoreError};

const MIN_PASSWORD_LEN: usize = 8;

/// Identity asserted by the OAuth adapter after a completed provider exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthIdentity {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub provider_name: String,
    pub provider_subject_id: String,
    /// Defaults to `email` when the provider reports no separate address.
    #[serde(default)]
    pub provider_email: Option<String>,
    #[serde(default)]
    pub provider_email_verified: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum AuthEvent {
    Credential { email: String, password: String },
    OAuth(OAuthIdentity),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// A resolved principal together with the session issued for it.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub principal: Principal,
    pub session: IssuedSession,
}

/// Resolves the event and issues a fresh session carrying the current role.
pub async fn resolve_identity(
    store: &dyn PrincipalStore,
    sessions: &SessionIssuer,
    event: AuthEvent,
) -> Result<Authenticated, AppError> {
    let principal = match event {
        AuthEvent::Credential { email, password } => {
            resolve_credential(store, &email, &password).await?
        }
        AuthEvent::OAuth(identity) => resolve_oauth(store, identity).await?,
    };
    let session = sessions.issue(&principal)?;
    Ok(Authenticated { principal, session })
}

async fn resolve_credential(
    store: &dyn PrincipalStore,
    email: &str,
    password: &str,
) -> Result<Principal, AppError> {
    let email = normalize_email(email);
    let found = store.find_by_email(&email).await?;
    // Unknown emails still run one verification, against a fixed hash.
    let stored = found.as_ref().and_then(|p| p.credential_secret.as_deref());
    let verified = verify_stored(stored, password);
    match found {
        Some(principal) if verified => Ok(principal),
        Some(principal) => {
            info!("Credential sign-in rejected for principal {}", principal.id);
            Err(AppError::InvalidCredentials)
        }
        None => Err(AppError::InvalidCredentials),
    }
}

async fn resolve_oauth(
    store: &dyn PrincipalStore,
    identity: OAuthIdentity,
) -> Result<Principal, AppError> {
    let email = normalize_email(&identity.email);
    let provider_name = identity.provider_name.trim().to_lowercase();
    let subject = identity.provider_subject_id.trim().to_string();
    if email.is_empty() {
        return Err(AppError::validation("email", "must not be empty"));
    }
    if provider_name.is_empty() {
        return Err(AppError::validation("provider_name", "must not be empty"));
    }
    if subject.is_empty() {
        return Err(AppError::validation("provider_subject_id", "must not be empty"));
    }
    if identity.provider_email_verified == Some(false) {
        return Err(AppError::validation(
            "provider_email_verified",
            "the provider has not verified this email address",
        ));
    }
    let provider_email = identity
        .provider_email
        .as_deref()
        .map(normalize_email)
        .unwrap_or_else(|| email.clone());
    if provider_email != email {
        return Err(AppError::EmailMismatch);
    }

    // Second pass only runs when a concurrent sign-in created the principal
    // between our lookup and our insert.
    for _ in 0..2 {
        if let Some(existing) = store.find_by_email(&email).await? {
            return match existing.linked_provider(&provider_name) {
                Some(link) if link.provider_subject_id == subject => Ok(existing),
                _ => {
                    warn!(
                        "OAuth sign-in via {provider_name} for existing principal {} without that link; refusing to merge",
                        existing.id
                    );
                    Err(AppError::AccountNotLinked {
                        provider: provider_name,
                    })
                }
            };
        }

        let name = match identity.name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            n => n.to_string(),
        };
        let new = NewPrincipal {
            email: email.clone(),
            name,
            credential_secret: None,
            role: Role::Unassigned,
            verified: true,
            linked_provider: Some(LinkedProvider {
                provider_name: provider_name.clone(),
                provider_subject_id: subject.clone(),
                provider_email: provider_email.clone(),
                linked_at: Utc::now(),
            }),
        };

        match store.create(new).await {
            Ok(created) => {
                info!("Created principal {} from {provider_name} sign-in", created.id);
                return Ok(created);
            }
            Err(StoreError::Conflict(what)) if what == "email" => continue,
            Err(StoreError::Conflict(_)) => return Err(AppError::ProviderAlreadyLinked),
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::StoreUnavailable(format!(
        "could not settle principal for {provider_name} sign-in"
    )))
}

/// Credential registration. A chosen role is optional and limited to the
/// self-assignable roles; otherwise the principal starts `unassigned`.
pub async fn register(
    store: &dyn PrincipalStore,
    sessions: &SessionIssuer,
    registration: Registration,
) -> Result<Authenticated, AppError> {
    let email = normalize_email(&registration.email);
    let name = registration.name.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("email", "must be a valid email address"));
    }
    if name.is_empty() {
        return Err(AppError::validation("name", "must not be empty"));
    }
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    let role = match registration.role.as_deref().map(str::trim) {
        None | Some("") => Role::Unassigned,
        Some(raw) => raw
            .parse::<Role>()
            .ok()
            .filter(Role::is_self_assignable)
            .ok_or_else(|| AppError::InvalidRole(format!("'{raw}' cannot be chosen at sign-up")))?,
    };

    let new = NewPrincipal {
        email,
        name: name.to_string(),
        credential_secret: Some(hash_secret(&registration.password)?),
        role,
        verified: false,
        linked_provider: None,
    };
    let principal = match store.create(new).await {
        Ok(p) => p,
        Err(StoreError::Conflict(_)) => return Err(AppError::EmailAlreadyRegistered),
        Err(e) => return Err(e.into()),
    };
    info!("Registered principal {} with role {}", principal.id, principal.role);

    let session = sessions.issue(&principal)?;
    Ok(Authenticated { principal, session })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::router::{next, Destination};
    use crate::store::MemoryPrincipalStore;
    use chrono::Duration;

    fn sessions() -> SessionIssuer {
        SessionIssuer::new(b"test-session-secret-that-is-long-enough", Duration::minutes(5))
    }

    fn google(email: &str, subject: &str) -> OAuthIdentity {
        OAuthIdentity {
            email: email.to_string(),
            name: "Google User".to_string(),
            provider_name: "google".to_string(),
            provider_subject_id: subject.to_string(),
            provider_email: Some(email.to_string()),
            provider_email_verified: Some(true),
        }
    }

    fn registration(email: &str, password: &str) -> Registration {
        Registration {
            email: email.to_string(),
            name: "Bee".to_string(),
            password: password.to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_new_oauth_user_is_created_unassigned_and_verified() {
        let store = MemoryPrincipalStore::new();
        let auth = resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("a@x.com", "g-1")))
            .await
            .unwrap();

        let p = &auth.principal;
        assert_eq!(p.email, "a@x.com");
        assert_eq!(p.role, Role::Unassigned);
        assert!(p.verified);
        assert!(p.credential_secret.is_none());
        assert_eq!(p.linked_provider("google").unwrap().provider_subject_id, "g-1");
        assert_eq!(auth.session.claims.role, Role::Unassigned);
        assert_eq!(next(Some(p)).destination, Destination::RoleSelection);
    }

    #[tokio::test]
    async fn test_returning_oauth_user_signs_in() {
        let store = MemoryPrincipalStore::new();
        let first = resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("a@x.com", "g-1")))
            .await
            .unwrap();
        let second = resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("A@X.com", "g-1")))
            .await
            .unwrap();
        assert_eq!(first.principal.id, second.principal.id);
        assert_ne!(first.session.claims.sid, second.session.claims.sid);
    }

    #[tokio::test]
    async fn test_oauth_for_credential_account_is_not_auto_linked() {
        let store = MemoryPrincipalStore::new();
        let registered = register(&store, &sessions(), registration("b@x.com", "password123"))
            .await
            .unwrap();

        let err = resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("b@x.com", "g-9")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountNotLinked { ref provider } if provider == "google"));

        let stored = store.find_by_id(registered.principal.id).await.unwrap().unwrap();
        assert!(stored.linked_providers.is_empty());
        assert!(!stored.verified);
        assert_eq!(stored.updated_at, registered.principal.updated_at);
    }

    #[tokio::test]
    async fn test_oauth_with_different_subject_is_not_linked() {
        let store = MemoryPrincipalStore::new();
        resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("a@x.com", "g-1")))
            .await
            .unwrap();
        let err = resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("a@x.com", "g-2")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountNotLinked { .. }));
    }

    #[tokio::test]
    async fn test_unverified_provider_email_is_refused() {
        let store = MemoryPrincipalStore::new();
        let mut identity = google("a@x.com", "g-1");
        identity.provider_email_verified = Some(false);
        let err = resolve_identity(&store, &sessions(), AuthEvent::OAuth(identity))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provider_email_must_match_email() {
        let store = MemoryPrincipalStore::new();
        let mut identity = google("a@x.com", "g-1");
        identity.provider_email = Some("other@x.com".to_string());
        let err = resolve_identity(&store, &sessions(), AuthEvent::OAuth(identity))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailMismatch));
    }

    #[tokio::test]
    async fn test_concurrent_first_oauth_sign_ins_create_one_principal() {
        let store = std::sync::Arc::new(MemoryPrincipalStore::new());
        let sessions = std::sync::Arc::new(sessions());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let sessions = sessions.clone();
            handles.push(tokio::spawn(async move {
                resolve_identity(
                    &*store,
                    &sessions,
                    AuthEvent::OAuth(google("race@x.com", "g-1")),
                )
                .await
                .map(|a| a.principal.id)
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_credential_sign_in() {
        let store = MemoryPrincipalStore::new();
        register(&store, &sessions(), registration("b@x.com", "password123"))
            .await
            .unwrap();

        let ok = resolve_identity(
            &store,
            &sessions(),
            AuthEvent::Credential {
                email: " B@x.com".to_string(),
                password: "password123".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.principal.email, "b@x.com");

        for (email, password) in [("b@x.com", "wrong-password"), ("nobody@x.com", "password123")] {
            let err = resolve_identity(
                &store,
                &sessions(),
                AuthEvent::Credential {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn test_unknown_email_costs_the_same_verification() {
        use crate::identity::password::ARGON2_VERIFICATIONS;

        let store = MemoryPrincipalStore::new();
        register(&store, &sessions(), registration("b@x.com", "password123"))
            .await
            .unwrap();
        let sign_in = |email: &str| AuthEvent::Credential {
            email: email.to_string(),
            password: "wrong-password".to_string(),
        };
        let count = || ARGON2_VERIFICATIONS.with(|n| n.get());

        let start = count();
        let known = resolve_identity(&store, &sessions(), sign_in("b@x.com")).await;
        let after_known = count();
        let unknown = resolve_identity(&store, &sessions(), sign_in("ghost@x.com")).await;
        let after_unknown = count();

        assert!(matches!(known, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
        assert_eq!(after_known - start, 1);
        assert_eq!(after_unknown - after_known, 1);
    }

    #[tokio::test]
    async fn test_oauth_only_principal_cannot_use_password() {
        let store = MemoryPrincipalStore::new();
        resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("a@x.com", "g-1")))
            .await
            .unwrap();
        let err = resolve_identity(
            &store,
            &sessions(),
            AuthEvent::Credential {
                email: "a@x.com".to_string(),
                password: "".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email_across_methods() {
        let store = MemoryPrincipalStore::new();
        resolve_identity(&store, &sessions(), AuthEvent::OAuth(google("a@x.com", "g-1")))
            .await
            .unwrap();
        let err = register(&store, &sessions(), registration("A@x.com", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn test_register_role_choice() {
        let store = MemoryPrincipalStore::new();
        let mut reg = registration("e@x.com", "password123");
        reg.role = Some("employer".to_string());
        let auth = register(&store, &sessions(), reg).await.unwrap();
        assert_eq!(auth.principal.role, Role::Employer);
        assert_eq!(auth.session.claims.role, Role::Employer);

        let mut reg = registration("f@x.com", "password123");
        reg.role = Some("admin".to_string());
        assert!(matches!(
            register(&store, &sessions(), reg).await.unwrap_err(),
            AppError::InvalidRole(_)
        ));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = MemoryPrincipalStore::new();
        let err = register(&store, &sessions(), registration("c@x.com", "short"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "password"));

        let err = register(&store, &sessions(), registration("not-an-email", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "email"));
    }
}
