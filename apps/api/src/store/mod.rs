//! Principal store: credential store and profile store behind one trait.
//!
//! `AppState` holds an `Arc<dyn PrincipalStore>`: `PgPrincipalStore` in
//! production, `MemoryPrincipalStore` when no database is configured.
//!
//! Every mutation is a single atomic operation at the store level. Email and
//! `(provider_name, provider_subject_id)` uniqueness are enforced by the store
//! itself, never by a check-then-act in the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::principal::{
    EmployerProfile, JobSeekerProfile, LinkedProvider, NewPrincipal, Principal, Role,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryPrincipalStore;
pub use postgres::PgPrincipalStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict on {0}")]
    Conflict(String),

    #[error("principal not found")]
    NotFound,

    /// Transient infrastructure failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Which questionnaire a skip applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Questionnaire {
    JobSeeker,
    Employer,
}

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Looks up by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError>;

    /// Creates a principal. Fails with `Conflict("email")` if the email is
    /// taken, or `Conflict("provider")` if the linked provider subject already
    /// belongs to someone else.
    async fn create(&self, new: NewPrincipal) -> Result<Principal, StoreError>;

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Principal, StoreError>;

    /// Adds a provider link and marks the principal verified. Fails with
    /// `Conflict("provider")` when the provider name is already linked to this
    /// principal or the subject is linked to another principal.
    async fn link_provider(&self, id: Uuid, link: LinkedProvider) -> Result<Principal, StoreError>;

    /// Replaces the job-seeker questionnaire record.
    async fn save_job_seeker_profile(
        &self,
        id: Uuid,
        profile: JobSeekerProfile,
    ) -> Result<Principal, StoreError>;

    /// Replaces the employer questionnaire record.
    async fn save_employer_profile(
        &self,
        id: Uuid,
        profile: EmployerProfile,
    ) -> Result<Principal, StoreError>;

    /// Sets `skipped` on the questionnaire record, creating an empty one if
    /// needed. Leaves `completed` and all answers untouched.
    async fn mark_skipped(&self, id: Uuid, questionnaire: Questionnaire)
        -> Result<Principal, StoreError>;

    /// Records a session id as revoked until `expires_at`. Entries past their
    /// expiry may be pruned.
    async fn revoke_session(&self, sid: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn is_revoked(&self, sid: Uuid) -> Result<bool, StoreError>;
}
