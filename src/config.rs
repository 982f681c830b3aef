//! Application configuration
//!
//! Everything is resolved once at startup and handed to constructors;
//! nothing downstream reads the process environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Override with `BARISTABOT_MODEL`; `gemini-1.5-flash-latest` has been retired upstream
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration errors, all fatal at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY not set. Add it to the environment or a .env file.")]
    MissingApiKey,
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Dialogue policy (LLM) configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_tokens: Option<u32>,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

/// Per-session turn limits
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Attempts per policy call before the turn fails
    pub max_retry_attempts: u32,
    /// First retry delay; doubles each attempt
    pub retry_base_delay: Duration,
    /// Maximum policy invocations in a single turn
    pub recursion_limit: u32,
    /// Sessions untouched for this long are evicted
    pub idle_timeout: Duration,
    /// Upper bound on live sessions; the least recently active idle one goes first
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_secs(1),
            recursion_limit: 25,
            idle_timeout: Duration::from_secs(30 * 60),
            max_sessions: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load from the process environment, after reading `.env` if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("GOOGLE_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let llm = LlmConfig {
            api_key,
            model: lookup("BARISTABOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("BARISTABOT_LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "BARISTABOT_LLM_TIMEOUT_SECS",
                60,
            )?),
            max_tokens: parse_opt(&lookup, "BARISTABOT_MAX_TOKENS")?,
        };

        let port: u16 = parse_or(&lookup, "BARISTABOT_PORT", 8000)?;
        let server = ServerConfig {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
        };

        let defaults = SessionConfig::default();
        let session = SessionConfig {
            max_retry_attempts: parse_or(
                &lookup,
                "BARISTABOT_MAX_RETRIES",
                defaults.max_retry_attempts,
            )?,
            retry_base_delay: Duration::from_millis(parse_or(
                &lookup,
                "BARISTABOT_RETRY_BASE_MS",
                1000,
            )?),
            recursion_limit: parse_or(
                &lookup,
                "BARISTABOT_RECURSION_LIMIT",
                defaults.recursion_limit,
            )?,
            idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "BARISTABOT_SESSION_IDLE_SECS",
                defaults.idle_timeout.as_secs(),
            )?),
            max_sessions: parse_or(&lookup, "BARISTABOT_MAX_SESSIONS", defaults.max_sessions)?,
        };

        if session.max_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "BARISTABOT_MAX_RETRIES",
                value: "0".to_string(),
            });
        }
        if session.recursion_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "BARISTABOT_RECURSION_LIMIT",
                value: "0".to_string(),
            });
        }

        if session.max_sessions == 0 {
            return Err(ConfigError::Invalid {
                var: "BARISTABOT_MAX_SESSIONS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            llm,
            server,
            session,
        })
    }
}

fn parse_opt<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            let parsed: Result<T, _> = value.trim().parse();
            parsed.map_err(|_| ConfigError::Invalid { var, value })
        })
        .transpose()
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse_opt(lookup, var)?.unwrap_or(default))
}
