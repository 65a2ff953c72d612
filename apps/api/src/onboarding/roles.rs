use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::principal::{Principal, Role};
use crate::store::PrincipalStore;

/// Self-service role selection. Only `jobSeeker` and `employer` may be
/// chosen; admins are provisioned out of band and cannot reassign themselves.
/// Profile sub-records are left untouched.
///
/// Callers must reissue the session afterwards so the token carries the new role.
pub async fn assign_role(
    store: &dyn PrincipalStore,
    principal_id: Uuid,
    requested: &str,
) -> Result<Principal, AppError> {
    let role = requested
        .trim()
        .parse::<Role>()
        .ok()
        .filter(Role::is_self_assignable)
        .ok_or_else(|| {
            AppError::InvalidRole(format!(
                "'{requested}' cannot be self-assigned; choose jobSeeker or employer"
            ))
        })?;

    let current = store
        .find_by_id(principal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Principal {principal_id} not found")))?;
    if current.role == Role::Admin {
        return Err(AppError::InvalidRole(
            "admin accounts cannot change role".to_string(),
        ));
    }

    let updated = store.set_role(principal_id, role).await?;
    info!("Principal {principal_id} assigned role {role}");
    Ok(updated)
}
