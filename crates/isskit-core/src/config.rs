//! Runtime configuration for the ISS adapter.
//!
//! Values come from [`IssConfig::default`] and may be overridden through the
//! environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ISSKIT_BASE_URL` | `base_url` |
//! | `ISSKIT_TIMEOUT_MS` | `timeout_ms` |
//! | `ISSKIT_RPS` | `requests_per_second` |
//! | `ISSKIT_PASSPORT` | `passport` |

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::http_client::HttpAuth;
use crate::ValidationError;

pub const DEFAULT_BASE_URL: &str = "https://iss.moex.com/iss";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Zero disables client-side throttling.
    pub requests_per_second: u32,
    /// Upper bound on `history.cursor` pages read for one history request.
    pub history_page_limit: usize,
    pub passport: Option<String>,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for IssConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: 10_000,
            requests_per_second: 10,
            history_page_limit: 200,
            passport: None,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl IssConfig {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup("ISSKIT_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url.trim().trim_end_matches('/').to_owned();
        }
        if let Some(raw) = lookup("ISSKIT_TIMEOUT_MS") {
            config.timeout_ms = parse_number("ISSKIT_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("ISSKIT_RPS") {
            config.requests_per_second = parse_number("ISSKIT_RPS", &raw)?;
        }
        config.passport = lookup("ISSKIT_PASSPORT").filter(|v| !v.trim().is_empty());

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn auth(&self) -> HttpAuth {
        self.passport
            .clone()
            .map_or(HttpAuth::None, HttpAuth::Passport)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ValidationError> {
    raw.trim().parse().map_err(|_| ValidationError::InvalidConfig {
        key,
        value: raw.to_owned(),
    })
}
