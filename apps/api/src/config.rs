use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::diff::DiffStrategy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub tracker_api_url: String,
    pub tracker_api_token: Option<String>,
    pub tracker_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub diff_strategy: DiffStrategy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            tracker_api_url: require_env("TRACKER_API_URL")?,
            tracker_api_token: std::env::var("TRACKER_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            tracker_timeout_secs: parse_env("TRACKER_TIMEOUT_SECS", 30)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            poll_interval_secs: parse_env("POLL_INTERVAL_SECS", 5)?,
            poll_max_attempts: parse_env("POLL_MAX_ATTEMPTS", 120)?,
            diff_strategy: match std::env::var("DIFF_STRATEGY") {
                Ok(value) => value.parse().map_err(|e: String| anyhow!(e))?,
                Err(_) => DiffStrategy::default(),
            },
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            tracker_api_url: "http://tracker.test".to_string(),
            tracker_api_token: None,
            tracker_timeout_secs: 30,
            port: 0,
            rust_log: "debug".to_string(),
            poll_interval_secs: 5,
            poll_max_attempts: 120,
            diff_strategy: DiffStrategy::WordLcs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        assert_eq!(parse_env::<u32>("REVIEW_API_TEST_UNSET_VAR", 120).unwrap(), 120);
    }

    #[test]
    fn test_poll_interval_is_seconds() {
        assert_eq!(Config::for_tests().poll_interval(), Duration::from_secs(5));
    }
}
