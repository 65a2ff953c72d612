//! Session issuer: HS256 session tokens carrying the principal's current role.
//!
//! Tokens are self-contained. Logout and role refresh record the session id
//! in the principal store's revocation list, so a revoked token stays revoked
//! across restarts and replicas until its natural expiry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::principal::{Principal, PrincipalView};
use crate::models::session::SessionClaims;
use crate::onboarding::router::{next, Destination};
use crate::store::PrincipalStore;

pub mod extract;

pub use extract::{AdapterAuth, AuthSession};

/// A freshly issued token and the claims inside it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Response body for every operation that (re)issues a session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub principal: PrincipalView,
    pub destination: Destination,
}

impl SessionResponse {
    pub fn new(session: IssuedSession, principal: &Principal) -> Self {
        SessionResponse {
            expires_at: session.claims.expires_at(),
            token: session.token,
            principal: PrincipalView::from(principal),
            destination: next(Some(principal)).destination,
        }
    }
}

pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        SessionIssuer {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issues a session for the principal's current role and email.
    pub fn issue(&self, principal: &Principal) -> Result<IssuedSession, AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sid: Uuid::new_v4(),
            sub: principal.id,
            role: principal.role,
            email: principal.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign session: {e}")))?;
        debug!("Issued session {} for principal {}", claims.sid, claims.sub);
        Ok(IssuedSession { token, claims })
    }

    /// Reads and validates a token. Any failure, including revocation, is
    /// `Unauthorized`; a store outage surfaces as `StoreUnavailable`.
    pub async fn read(
        &self,
        store: &dyn PrincipalStore,
        token: &str,
    ) -> Result<SessionClaims, AppError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Rejected session token: {e}");
            AppError::Unauthorized
        })?;
        if store.is_revoked(data.claims.sid).await? {
            debug!("Rejected revoked session {}", data.claims.sid);
            return Err(AppError::Unauthorized);
        }
        Ok(data.claims)
    }

    /// Invalidates a session until it would have expired anyway.
    pub async fn revoke(
        &self,
        store: &dyn PrincipalStore,
        claims: &SessionClaims,
    ) -> Result<(), AppError> {
        store.revoke_session(claims.sid, claims.expires_at()).await?;
        debug!("Revoked session {} for principal {}", claims.sid, claims.sub);
        Ok(())
    }
}
