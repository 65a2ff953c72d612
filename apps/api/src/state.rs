use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionIssuer;
use crate::store::PrincipalStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Credential and profile store. Postgres, or in-memory when no database is configured.
    pub store: Arc<dyn PrincipalStore>,
    pub sessions: Arc<SessionIssuer>,
    pub config: Config,
}
