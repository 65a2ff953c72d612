use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Identity and validation variants are actionable by the end user and are
/// surfaced verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(
        "An account with this email already exists. Sign in with your original method, \
         then link {provider} from your account settings"
    )]
    AccountNotLinked { provider: String },

    #[error("Provider email does not match the signed-in account")]
    EmailMismatch,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Validation error on '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("An account with this email is already registered")]
    EmailAlreadyRegistered,

    #[error("This provider identity is already linked")]
    ProviderAlreadyLinked,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::AccountNotLinked { .. } => "ACCOUNT_NOT_LINKED",
            AppError::EmailMismatch => "EMAIL_MISMATCH",
            AppError::InvalidRole(_) => "INVALID_ROLE",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            AppError::ProviderAlreadyLinked => "PROVIDER_ALREADY_LINKED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound("Principal not found".to_string()),
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Conflict(what) => {
                AppError::Internal(anyhow::anyhow!("unhandled store conflict: {what}"))
            }
        }
    }
}

/// Malformed bodies, including unknown or forbidden fields, surface as a
/// validation error on `body`.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AccountNotLinked { .. }
            | AppError::EmailAlreadyRegistered
            | AppError::ProviderAlreadyLinked => StatusCode::CONFLICT,
            AppError::EmailMismatch => StatusCode::FORBIDDEN,
            AppError::InvalidRole(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {msg}");
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AppError::StoreUnavailable(_) => "The service is temporarily unavailable".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        };

        let mut error = json!({
            "code": self.code(),
            "message": message,
        });
        if let AppError::Validation { field, .. } = &self {
            error["field"] = json!(field);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_reports_field() {
        let resp = AppError::validation("experience_level", "must be one of student, fresher, experienced")
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "experience_level");
    }

    #[tokio::test]
    async fn test_account_not_linked_carries_guidance() {
        let resp = AppError::AccountNotLinked {
            provider: "google".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = body_json(resp).await;
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("Sign in with your original method"));
        assert!(message.contains("google"));
    }

    #[tokio::test]
    async fn test_store_unavailable_hides_detail() {
        let resp = AppError::StoreUnavailable("pool timed out".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(resp).await;
        assert!(!body["error"]["message"].as_str().unwrap().contains("pool"));
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            AppError::from(StoreError::NotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::Unavailable("down".into())),
            AppError::StoreUnavailable(_)
        ));
    }
}
