mod config;
mod db;
mod errors;
mod guard;
mod identity;
mod models;
mod onboarding;
mod routes;
mod session;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::session::SessionIssuer;
use crate::state::AppState;
use crate::store::{MemoryPrincipalStore, PgPrincipalStore, PrincipalStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Portal API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize principal store
    let store: Arc<dyn PrincipalStore> = match &config.database_url {
        Some(url) => Arc::new(PgPrincipalStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; using in-memory principal store (data is lost on restart)");
            Arc::new(MemoryPrincipalStore::new())
        }
    };

    // Initialize session issuer
    let sessions = Arc::new(SessionIssuer::new(
        config.session_secret.as_bytes(),
        chrono::Duration::minutes(config.session_ttl_minutes),
    ));
    info!("Session issuer initialized (ttl: {} min)", config.session_ttl_minutes);

    let state = AppState {
        store,
        sessions,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
