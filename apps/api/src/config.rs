use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent means the in-memory principal store is used.
    pub database_url: Option<String>,
    pub session_secret: String,
    pub session_ttl_minutes: i64,
    /// Shared secret presented by the OAuth adapter on callback and link requests.
    pub identity_adapter_key: String,
    pub port: u16,
    pub rust_log: String,
}

const MIN_SESSION_SECRET_LEN: usize = 32;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let session_secret = require_env("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            bail!("SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes");
        }

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            session_secret,
            session_ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .unwrap_or_else(|_| "720".to_string())
                .parse::<i64>()
                .context("SESSION_TTL_MINUTES must be a whole number of minutes")?,
            identity_adapter_key: require_env("IDENTITY_ADAPTER_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: None,
            session_secret: "test-session-secret-that-is-long-enough".to_string(),
            session_ttl_minutes: 60,
            identity_adapter_key: "test-adapter-key".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
