use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Portal role. `Unassigned` until the user picks one during onboarding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Unassigned,
    #[serde(alias = "job_seeker")]
    JobSeeker,
    Employer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unassigned => "unassigned",
            Role::JobSeeker => "jobSeeker",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }

    /// Roles a user may pick for themselves.
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Role::JobSeeker | Role::Employer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unassigned" => Ok(Role::Unassigned),
            "jobSeeker" | "job_seeker" => Ok(Role::JobSeeker),
            "employer" => Ok(Role::Employer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Student,
    Fresher,
    Experienced,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 3] = [
        ExperienceLevel::Student,
        ExperienceLevel::Fresher,
        ExperienceLevel::Experienced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Student => "student",
            ExperienceLevel::Fresher => "fresher",
            ExperienceLevel::Experienced => "experienced",
        }
    }
}

/// Fixed set of fields a job seeker can be interested in. Employers use the
/// same set to describe their industry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldOfInterest {
    SoftwareDevelopment,
    DataScience,
    Design,
    ProductManagement,
    Marketing,
    Sales,
    Finance,
    Healthcare,
    Education,
    Engineering,
    HumanResources,
    CustomerSupport,
}

impl FieldOfInterest {
    pub const ALL: [FieldOfInterest; 12] = [
        FieldOfInterest::SoftwareDevelopment,
        FieldOfInterest::DataScience,
        FieldOfInterest::Design,
        FieldOfInterest::ProductManagement,
        FieldOfInterest::Marketing,
        FieldOfInterest::Sales,
        FieldOfInterest::Finance,
        FieldOfInterest::Healthcare,
        FieldOfInterest::Education,
        FieldOfInterest::Engineering,
        FieldOfInterest::HumanResources,
        FieldOfInterest::CustomerSupport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOfInterest::SoftwareDevelopment => "software_development",
            FieldOfInterest::DataScience => "data_science",
            FieldOfInterest::Design => "design",
            FieldOfInterest::ProductManagement => "product_management",
            FieldOfInterest::Marketing => "marketing",
            FieldOfInterest::Sales => "sales",
            FieldOfInterest::Finance => "finance",
            FieldOfInterest::Healthcare => "healthcare",
            FieldOfInterest::Education => "education",
            FieldOfInterest::Engineering => "engineering",
            FieldOfInterest::HumanResources => "human_resources",
            FieldOfInterest::CustomerSupport => "customer_support",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-500")]
    Large,
    #[serde(rename = "500+")]
    Enterprise,
}

impl CompanySize {
    pub const ALL: [CompanySize; 5] = [
        CompanySize::Micro,
        CompanySize::Small,
        CompanySize::Medium,
        CompanySize::Large,
        CompanySize::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySize::Micro => "1-10",
            CompanySize::Small => "11-50",
            CompanySize::Medium => "51-200",
            CompanySize::Large => "201-500",
            CompanySize::Enterprise => "500+",
        }
    }
}

/// An OAuth identity attached to a principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedProvider {
    pub provider_name: String,
    pub provider_subject_id: String,
    pub provider_email: String,
    pub linked_at: DateTime<Utc>,
}

/// Job-seeker questionnaire answers.
///
/// `skipped` records that the user chose to go straight to the dashboard.
/// It never implies `completed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSeekerProfile {
    pub experience_level: Option<ExperienceLevel>,
    pub field_of_interest: Option<FieldOfInterest>,
    pub completed: bool,
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployerProfile {
    pub company_name: Option<String>,
    pub company_size: Option<CompanySize>,
    pub industry: Option<FieldOfInterest>,
    pub company_website: Option<String>,
    pub completed: bool,
    pub skipped: bool,
}

/// A unique identity record. Email is the reconciliation key across auth
/// methods and is always stored normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Argon2 PHC string. `None` for OAuth-only principals.
    #[serde(skip_serializing)]
    pub credential_secret: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub linked_providers: Vec<LinkedProvider>,
    pub job_seeker_profile: Option<JobSeekerProfile>,
    pub employer_profile: Option<EmployerProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn linked_provider(&self, provider_name: &str) -> Option<&LinkedProvider> {
        self.linked_providers
            .iter()
            .find(|p| p.provider_name == provider_name)
    }
}

/// Input to `PrincipalStore::create`.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub name: String,
    pub credential_secret: Option<String>,
    pub role: Role,
    pub verified: bool,
    pub linked_provider: Option<LinkedProvider>,
}

/// Public projection returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub verified: bool,
    pub linked_providers: Vec<String>,
    pub has_password: bool,
    pub job_seeker_profile: Option<JobSeekerProfile>,
    pub employer_profile: Option<EmployerProfile>,
}

impl From<&Principal> for PrincipalView {
    fn from(p: &Principal) -> Self {
        PrincipalView {
            id: p.id,
            email: p.email.clone(),
            name: p.name.clone(),
            role: p.role,
            verified: p.verified,
            linked_providers: p
                .linked_providers
                .iter()
                .map(|l| l.provider_name.clone())
                .collect(),
            has_password: p.credential_secret.is_some(),
            job_seeker_profile: p.job_seeker_profile.clone(),
            employer_profile: p.employer_profile.clone(),
        }
    }
}

/// Trims and lowercases an email address so that lookups and comparisons
/// across auth methods agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ────────────────────────────────────────────────────────────────────────────
// Row types (Postgres)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct PrincipalRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub credential_secret: Option<String>,
    pub role: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LinkedProviderRow {
    pub provider_name: String,
    pub provider_subject_id: String,
    pub provider_email: String,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct JobSeekerProfileRow {
    pub experience_level: Option<String>,
    pub field_of_interest: Option<String>,
    pub completed: bool,
    pub skipped: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct EmployerProfileRow {
    pub company_name: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub company_website: Option<String>,
    pub completed: bool,
    pub skipped: bool,
}

impl From<LinkedProviderRow> for LinkedProvider {
    fn from(row: LinkedProviderRow) -> Self {
        LinkedProvider {
            provider_name: row.provider_name,
            provider_subject_id: row.provider_subject_id,
            provider_email: row.provider_email,
            linked_at: row.linked_at,
        }
    }
}

impl From<JobSeekerProfileRow> for JobSeekerProfile {
    // Unrecognised stored values read back as unanswered rather than failing the load.
    fn from(row: JobSeekerProfileRow) -> Self {
        JobSeekerProfile {
            experience_level: row.experience_level.as_deref().and_then(|v| {
                ExperienceLevel::ALL.into_iter().find(|e| e.as_str() == v)
            }),
            field_of_interest: row.field_of_interest.as_deref().and_then(|v| {
                FieldOfInterest::ALL.into_iter().find(|f| f.as_str() == v)
            }),
            completed: row.completed,
            skipped: row.skipped,
        }
    }
}

impl From<EmployerProfileRow> for EmployerProfile {
    fn from(row: EmployerProfileRow) -> Self {
        EmployerProfile {
            company_name: row.company_name,
            company_size: row
                .company_size
                .as_deref()
                .and_then(|v| CompanySize::ALL.into_iter().find(|s| s.as_str() == v)),
            industry: row
                .industry
                .as_deref()
                .and_then(|v| FieldOfInterest::ALL.into_iter().find(|f| f.as_str() == v)),
            company_website: row.company_website,
            completed: row.completed,
            skipped: row.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::JobSeeker).unwrap(), "\"jobSeeker\"");
        let r: Role = serde_json::from_str("\"job_seeker\"").unwrap();
        assert_eq!(r, Role::JobSeeker);
        assert_eq!("employer".parse::<Role>().unwrap(), Role::Employer);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_only_job_seeker_and_employer_are_self_assignable() {
        assert!(Role::JobSeeker.is_self_assignable());
        assert!(Role::Employer.is_self_assignable());
        assert!(!Role::Admin.is_self_assignable());
        assert!(!Role::Unassigned.is_self_assignable());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_field_of_interest_has_twelve_values() {
        assert_eq!(FieldOfInterest::ALL.len(), 12);
        let json = serde_json::to_string(&FieldOfInterest::HumanResources).unwrap();
        assert_eq!(json, "\"human_resources\"");
    }

    #[test]
    fn test_company_size_serde_matches_as_str() {
        for size in CompanySize::ALL {
            let json = serde_json::to_string(&size).unwrap();
            assert_eq!(json, format!("\"{}\"", size.as_str()));
        }
    }

    #[test]
    fn test_job_seeker_row_with_unknown_value_reads_as_unanswered() {
        let profile: JobSeekerProfile = JobSeekerProfileRow {
            experience_level: Some("expert".to_string()),
            field_of_interest: Some("data_science".to_string()),
            completed: false,
            skipped: false,
        }
        .into();
        assert_eq!(profile.experience_level, None);
        assert_eq!(profile.field_of_interest, Some(FieldOfInterest::DataScience));
    }

    #[test]
    fn test_view_hides_secret() {
        let p = Principal {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            credential_secret: Some("$argon2id$...".to_string()),
            role: Role::Unassigned,
            verified: false,
            linked_providers: vec![],
            job_seeker_profile: None,
            employer_profile: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = PrincipalView::from(&p);
        assert!(view.has_password);
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("credential_secret").is_none());
    }
}
