use serde::Deserialize;
use url::Url;

use crate::errors::AppError;
use crate::models::principal::{
    CompanySize, EmployerProfile, ExperienceLevel, FieldOfInterest, JobSeekerProfile,
};

const MAX_COMPANY_NAME_LEN: usize = 120;

/// Job-seeker questionnaire body. Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSeekerAnswers {
    pub experience_level: String,
    pub field_of_interest: String,
}

/// Employer questionnaire body. Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployerAnswers {
    pub company_name: String,
    pub company_size: String,
    pub industry: String,
    #[serde(default)]
    pub company_website: Option<String>,
}

fn one_of<T: Copy>(
    field: &str,
    value: &str,
    allowed: &[T],
    as_str: fn(&T) -> &'static str,
) -> Result<T, AppError> {
    let value = value.trim();
    allowed
        .iter()
        .find(|candidate| as_str(candidate) == value)
        .copied()
        .ok_or_else(|| {
            let names: Vec<&str> = allowed.iter().map(as_str).collect();
            AppError::validation(
                field,
                format!("'{value}' is not one of: {}", names.join(", ")),
            )
        })
}

/// Validates questionnaire answers into a completed profile.
pub fn validate_job_seeker(answers: &JobSeekerAnswers) -> Result<JobSeekerProfile, AppError> {
    let experience_level = one_of(
        "experience_level",
        &answers.experience_level,
        &ExperienceLevel::ALL,
        ExperienceLevel::as_str,
    )?;
    let field_of_interest = one_of(
        "field_of_interest",
        &answers.field_of_interest,
        &FieldOfInterest::ALL,
        FieldOfInterest::as_str,
    )?;

    Ok(JobSeekerProfile {
        experience_level: Some(experience_level),
        field_of_interest: Some(field_of_interest),
        completed: true,
        skipped: false,
    })
}

pub fn validate_employer(answers: &EmployerAnswers) -> Result<EmployerProfile, AppError> {
    let company_name = answers.company_name.trim();
    if company_name.is_empty() {
        return Err(AppError::validation("company_name", "must not be empty"));
    }
    if company_name.chars().count() > MAX_COMPANY_NAME_LEN {
        return Err(AppError::validation(
            "company_name",
            format!("must be at most {MAX_COMPANY_NAME_LEN} characters"),
        ));
    }

    let company_size = one_of(
        "company_size",
        &answers.company_size,
        &CompanySize::ALL,
        CompanySize::as_str,
    )?;
    let industry = one_of(
        "industry",
        &answers.industry,
        &FieldOfInterest::ALL,
        FieldOfInterest::as_str,
    )?;

    let company_website = match answers.company_website.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let parsed = Url::parse(raw)
                .map_err(|e| AppError::validation("company_website", e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::validation(
                    "company_website",
                    "must be an http or https URL",
                ));
            }
            Some(parsed.to_string())
        }
    };

    Ok(EmployerProfile {
        company_name: Some(company_name.to_string()),
        company_size: Some(company_size),
        industry: Some(industry),
        company_website,
        completed: true,
        skipped: false,
    })
}
