use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::principal::{
    EmployerProfile, JobSeekerProfile, LinkedProvider, NewPrincipal, Principal, Role,
};
use crate::store::{PrincipalStore, Questionnaire, StoreError};

/// In-process principal store. Used when no database is configured and in tests.
///
/// All checks and writes happen under one write lock, so uniqueness holds
/// under concurrent callers.
#[derive(Default)]
pub struct MemoryPrincipalStore {
    principals: RwLock<HashMap<Uuid, Principal>>,
    revoked_sessions: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: Uuid, f: F) -> Result<Principal, StoreError>
    where
        F: FnOnce(&mut Principal) -> Result<(), StoreError> + Send,
    {
        let mut principals = self.principals.write().await;
        let principal = principals.get_mut(&id).ok_or(StoreError::NotFound)?;
        f(principal)?;
        principal.updated_at = Utc::now();
        Ok(principal.clone())
    }
}

fn subject_taken(
    principals: &HashMap<Uuid, Principal>,
    link: &LinkedProvider,
    except: Option<Uuid>,
) -> bool {
    principals.values().any(|p| {
        Some(p.id) != except
            && p.linked_providers.iter().any(|l| {
                l.provider_name == link.provider_name
                    && l.provider_subject_id == link.provider_subject_id
            })
    })
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        let principals = self.principals.read().await;
        Ok(principals.values().find(|p| p.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError> {
        Ok(self.principals.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        let mut principals = self.principals.write().await;
        if principals.values().any(|p| p.email == new.email) {
            return Err(StoreError::Conflict("email".to_string()));
        }
        if let Some(link) = &new.linked_provider {
            if subject_taken(&principals, link, None) {
                return Err(StoreError::Conflict("provider".to_string()));
            }
        }

        let now = Utc::now();
        let principal = Principal {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            credential_secret: new.credential_secret,
            role: new.role,
            verified: new.verified,
            linked_providers: new.linked_provider.into_iter().collect(),
            job_seeker_profile: None,
            employer_profile: None,
            created_at: now,
            updated_at: now,
        };
        principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Principal, StoreError> {
        self.update(id, |p| {
            p.role = role;
            Ok(())
        })
        .await
    }

    async fn link_provider(&self, id: Uuid, link: LinkedProvider) -> Result<Principal, StoreError> {
        let mut principals = self.principals.write().await;
        if subject_taken(&principals, &link, Some(id)) {
            return Err(StoreError::Conflict("provider".to_string()));
        }
        let principal = principals.get_mut(&id).ok_or(StoreError::NotFound)?;
        if principal.linked_provider(&link.provider_name).is_some() {
            return Err(StoreError::Conflict("provider".to_string()));
        }
        principal.linked_providers.push(link);
        principal.verified = true;
        principal.updated_at = Utc::now();
        Ok(principal.clone())
    }

    async fn save_job_seeker_profile(
        &self,
        id: Uuid,
        profile: JobSeekerProfile,
    ) -> Result<Principal, StoreError> {
        self.update(id, |p| {
            p.job_seeker_profile = Some(profile);
            Ok(())
        })
        .await
    }

    async fn save_employer_profile(
        &self,
        id: Uuid,
        profile: EmployerProfile,
    ) -> Result<Principal, StoreError> {
        self.update(id, |p| {
            p.employer_profile = Some(profile);
            Ok(())
        })
        .await
    }

    async fn mark_skipped(
        &self,
        id: Uuid,
        questionnaire: Questionnaire,
    ) -> Result<Principal, StoreError> {
        self.update(id, |p| {
            match questionnaire {
                Questionnaire::JobSeeker => {
                    p.job_seeker_profile.get_or_insert_with(Default::default).skipped = true
                }
                Questionnaire::Employer => {
                    p.employer_profile.get_or_insert_with(Default::default).skipped = true
                }
            }
            Ok(())
        })
        .await
    }

    async fn revoke_session(&self, sid: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut revoked = self.revoked_sessions.write().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(sid, expires_at);
        Ok(())
    }

    async fn is_revoked(&self, sid: Uuid) -> Result<bool, StoreError> {
        Ok(self.revoked_sessions.read().await.contains_key(&sid))
    }
}
