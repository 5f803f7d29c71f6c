use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if the API key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// HTTP timeout for every call to the generative-language service.
    pub llm_timeout_secs: u64,
    pub max_upload_bytes: usize,
    /// Idle sessions are evicted after this many seconds without activity.
    pub session_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_timeout_secs: optional_env("LLM_TIMEOUT_SECS", 120)?,
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            session_ttl_secs: optional_env("SESSION_TTL_SECS", 1800)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
