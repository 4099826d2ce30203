use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Constructed once in `main` and handed to components explicitly —
/// no module reads the environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub openai_api_key: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_expiry_minutes: std::env::var("JWT_EXPIRY_MINUTES")
                .unwrap_or_else(|_| "1440".to_string())
                .parse::<u64>()
                .context("JWT_EXPIRY_MINUTES must be a number of minutes")?,
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
