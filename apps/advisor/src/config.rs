use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Settings for the generation endpoint. Handed to the gateway at construction.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// 0.0 – 2.0
    pub temperature: f32,
    /// 500 – 4000
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or out of range.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub generation: GenerationSettings,
    pub cache_ttl: Duration,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub admin_token: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds and validates the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let api_key = env.require("OPENAI_API_KEY")?;
        if api_key.trim().is_empty() {
            bail!("OPENAI_API_KEY must not be empty");
        }

        let model = env.or("OPENAI_MODEL", DEFAULT_MODEL);
        if model.trim().is_empty() {
            bail!("OPENAI_MODEL must not be empty");
        }

        let temperature: f32 = env.parse_or("OPENAI_TEMPERATURE", 0.7)?;
        if !(0.0..=2.0).contains(&temperature) {
            bail!("OPENAI_TEMPERATURE must be between 0.0 and 2.0, got {temperature}");
        }

        let max_tokens: u32 = env.parse_or("OPENAI_MAX_TOKENS", 1500)?;
        if !(500..=4000).contains(&max_tokens) {
            bail!("OPENAI_MAX_TOKENS must be between 500 and 4000, got {max_tokens}");
        }

        let timeout_secs: u64 = env.parse_or("OPENAI_TIMEOUT_SECS", 30)?;
        if !(1..=120).contains(&timeout_secs) {
            bail!("OPENAI_TIMEOUT_SECS must be between 1 and 120, got {timeout_secs}");
        }

        let cache_ttl_secs: u64 = env.parse_or("CACHE_TTL_SECS", 3600)?;
        let rate_limit_max: u32 = env.parse_or("RATE_LIMIT_MAX", 10)?;
        let rate_limit_window_secs: u64 = env.parse_or("RATE_LIMIT_WINDOW_SECS", 60)?;
        if cache_ttl_secs == 0 || rate_limit_max == 0 || rate_limit_window_secs == 0 {
            bail!("CACHE_TTL_SECS, RATE_LIMIT_MAX and RATE_LIMIT_WINDOW_SECS must be positive");
        }

        Ok(Config {
            database_url: env.require("DATABASE_URL")?,
            redis_url: env.require("REDIS_URL")?,
            generation: GenerationSettings {
                api_url: env.or("OPENAI_API_URL", DEFAULT_API_URL),
                api_key,
                model,
                temperature,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            },
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            rate_limit_max,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            admin_token: lookup("ADMIN_TOKEN").filter(|t| !t.trim().is_empty()),
            port: env
                .or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env.or("RUST_LOG", "info"),
        })
    }
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn require(&self, key: &str) -> Result<String> {
        (self.0)(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match (self.0)(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value '{raw}'")),
            None => Ok(default),
        }
    }
}
