use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::principal::{
    EmployerProfile, EmployerProfileRow, JobSeekerProfile, JobSeekerProfileRow, LinkedProvider,
    LinkedProviderRow, NewPrincipal, Principal, PrincipalRow, Role,
};
use crate::store::{PrincipalStore, Questionnaire, StoreError};

enum PrincipalKey<'a> {
    Email(&'a str),
    Id(Uuid),
}

/// Postgres-backed principal store. Uniqueness is enforced by the
/// `principals_email_key` and `linked_providers_subject_key` constraints.
#[derive(Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads the principal and its provider and profile rows from one
    /// `REPEATABLE READ` snapshot.
    async fn load(&self, key: PrincipalKey<'_>) -> Result<Option<Principal>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let row: Option<PrincipalRow> = match key {
            PrincipalKey::Email(email) => {
                sqlx::query_as(&format!("{SELECT_PRINCIPAL} WHERE email = $1"))
                    .bind(email)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            PrincipalKey::Id(id) => {
                sqlx::query_as(&format!("{SELECT_PRINCIPAL} WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };
        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Unavailable(format!("principal {}: {e}", row.id)))?;

        let linked_providers: Vec<LinkedProviderRow> = sqlx::query_as(
            r#"
            SELECT provider_name, provider_subject_id, provider_email, linked_at
            FROM linked_providers
            WHERE principal_id = $1
            ORDER BY linked_at
            "#,
        )
        .bind(row.id)
        .fetch_all(&mut *tx)
        .await?;

        let job_seeker_profile: Option<JobSeekerProfileRow> = sqlx::query_as(
            r#"
            SELECT experience_level, field_of_interest, completed, skipped
            FROM job_seeker_profiles
            WHERE principal_id = $1
            "#,
        )
        .bind(row.id)
        .fetch_optional(&mut *tx)
        .await?;

        let employer_profile: Option<EmployerProfileRow> = sqlx::query_as(
            r#"
            SELECT company_name, company_size, industry, company_website, completed, skipped
            FROM employer_profiles
            WHERE principal_id = $1
            "#,
        )
        .bind(row.id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(Principal {
            id: row.id,
            email: row.email,
            name: row.name,
            credential_secret: row.credential_secret,
            role,
            verified: row.verified,
            linked_providers: linked_providers.into_iter().map(Into::into).collect(),
            job_seeker_profile: job_seeker_profile.map(Into::into),
            employer_profile: employer_profile.map(Into::into),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn load_by_id(&self, id: Uuid) -> Result<Principal, StoreError> {
        self.find_by_id(id).await?.ok_or(StoreError::NotFound)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let what = match db.constraint() {
                    Some("principals_email_key") => "email",
                    _ => "provider",
                };
                StoreError::Conflict(what.to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound,
            _ => StoreError::Unavailable(e.to_string()),
        }
    }
}

const SELECT_PRINCIPAL: &str = r#"
    SELECT id, email, name, credential_secret, role, verified, created_at, updated_at
    FROM principals
"#;

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        self.load(PrincipalKey::Email(email)).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, StoreError> {
        self.load(PrincipalKey::Id(id)).await
    }

    async fn create(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO principals (id, email, name, credential_secret, role, verified)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.credential_secret)
        .bind(new.role.as_str())
        .bind(new.verified)
        .execute(&mut *tx)
        .await?;

        if let Some(link) = &new.linked_provider {
            sqlx::query(
                r#"
                INSERT INTO linked_providers
                    (principal_id, provider_name, provider_subject_id, provider_email, linked_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(&link.provider_name)
            .bind(&link.provider_subject_id)
            .bind(&link.provider_email)
            .bind(link.linked_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Created principal {id}");
        self.load_by_id(id).await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Principal, StoreError> {
        let result =
            sqlx::query("UPDATE principals SET role = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(role.as_str())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        self.load_by_id(id).await
    }

    async fn link_provider(&self, id: Uuid, link: LinkedProvider) -> Result<Principal, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE principals SET verified = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        // Primary key (principal_id, provider_name) keeps one link per provider.
        sqlx::query(
            r#"
            INSERT INTO linked_providers
                (principal_id, provider_name, provider_subject_id, provider_email, linked_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&link.provider_name)
        .bind(&link.provider_subject_id)
        .bind(&link.provider_email)
        .bind(link.linked_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.load_by_id(id).await
    }

    async fn save_job_seeker_profile(
        &self,
        id: Uuid,
        profile: JobSeekerProfile,
    ) -> Result<Principal, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO job_seeker_profiles
                (principal_id, experience_level, field_of_interest, completed, skipped)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (principal_id) DO UPDATE SET
                experience_level = EXCLUDED.experience_level,
                field_of_interest = EXCLUDED.field_of_interest,
                completed = EXCLUDED.completed,
                skipped = EXCLUDED.skipped,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(profile.experience_level.map(|e| e.as_str()))
        .bind(profile.field_of_interest.map(|f| f.as_str()))
        .bind(profile.completed)
        .bind(profile.skipped)
        .execute(&self.pool)
        .await?;

        self.load_by_id(id).await
    }

    async fn save_employer_profile(
        &self,
        id: Uuid,
        profile: EmployerProfile,
    ) -> Result<Principal, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO employer_profiles
                (principal_id, company_name, company_size, industry, company_website,
                 completed, skipped)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (principal_id) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                company_size = EXCLUDED.company_size,
                industry = EXCLUDED.industry,
                company_website = EXCLUDED.company_website,
                completed = EXCLUDED.completed,
                skipped = EXCLUDED.skipped,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(&profile.company_name)
        .bind(profile.company_size.map(|s| s.as_str()))
        .bind(profile.industry.map(|f| f.as_str()))
        .bind(&profile.company_website)
        .bind(profile.completed)
        .bind(profile.skipped)
        .execute(&self.pool)
        .await?;

        self.load_by_id(id).await
    }

    async fn mark_skipped(
        &self,
        id: Uuid,
        questionnaire: Questionnaire,
    ) -> Result<Principal, StoreError> {
        let sql = match questionnaire {
            Questionnaire::JobSeeker => {
                r#"
                INSERT INTO job_seeker_profiles (principal_id, skipped) VALUES ($1, TRUE)
                ON CONFLICT (principal_id) DO UPDATE SET skipped = TRUE, updated_at = NOW()
                "#
            }
            Questionnaire::Employer => {
                r#"
                INSERT INTO employer_profiles (principal_id, skipped) VALUES ($1, TRUE)
                ON CONFLICT (principal_id) DO UPDATE SET skipped = TRUE, updated_at = NOW()
                "#
            }
        };
        sqlx::query(sql).bind(id).execute(&self.pool).await?;

        self.load_by_id(id).await
    }

    async fn revoke_session(&self, sid: Uuid, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO revoked_sessions (sid, expires_at) VALUES ($1, $2)
            ON CONFLICT (sid) DO NOTHING
            "#,
        )
        .bind(sid)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        debug!("Revoked session {sid}");
        Ok(())
    }

    async fn is_revoked(&self, sid: Uuid) -> Result<bool, StoreError> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_sessions WHERE sid = $1)")
                .bind(sid)
                .fetch_one(&self.pool)
                .await?;
        Ok(revoked)
    }
}
