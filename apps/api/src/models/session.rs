use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::principal::Role;

/// Claims carried in a session token. Passed explicitly into the onboarding
/// router; there is no ambient session object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Session id, the revocation handle used at logout.
    pub sid: Uuid,
    /// Principal id.
    pub sub: Uuid,
    pub role: Role,
    pub email: String,
    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expires at (Unix timestamp, seconds).
    pub exp: i64,
}

impl SessionClaims {
    pub fn principal_id(&self) -> Uuid {
        self.sub
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}
