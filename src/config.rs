// src/config.rs

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

use crate::error::AppError;

/// Freshness window for cached reads.
pub const STALE_TIME_SECS: u64 = 5 * 60;

/// Retention window for unused cache entries.
pub const CACHE_TIME_SECS: u64 = 30 * 60;

/// Countdown tick period of the contest view and the admin contest list.
pub const TICK_INTERVAL_MS: u64 = 1000;

/// Every contest question carries exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Length of the numeric one-time codes sent by the API.
pub const OTP_LENGTH: usize = 6;

const DEFAULT_SESSION_FILE: &str = ".club_session.json";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_GENAI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GENAI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the REST API, e.g. `https://api.club.dev/api`.
    pub api_base_url: Url,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
    pub rust_log: String,
    pub genai: Option<GenAiConfig>,
}

/// Credentials for the external question generator. Absent when no key is configured.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let raw_url = env::var("API_BASE_URL")
            .map_err(|_| AppError::Config("API_BASE_URL must be set".to_string()))?;
        let api_base_url = parse_base_url(&raw_url)?;

        let session_file = env::var("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));

        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                AppError::Config(format!("REQUEST_TIMEOUT_SECS is not a number: {raw}"))
            })?),
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let genai = env::var("GENAI_API_KEY").ok().map(|api_key| GenAiConfig {
            api_key,
            endpoint: env::var("GENAI_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_GENAI_ENDPOINT.to_string()),
            model: env::var("GENAI_MODEL").unwrap_or_else(|_| DEFAULT_GENAI_MODEL.to_string()),
        });

        Ok(Self {
            api_base_url,
            session_file,
            request_timeout,
            rust_log,
            genai,
        })
    }

    /// Configuration pointing at `base_url` with defaults everywhere else.
    pub fn for_base_url(base_url: &str) -> Result<Self, AppError> {
        Ok(Self {
            api_base_url: parse_base_url(base_url)?,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            rust_log: "info".to_string(),
            genai: None,
        })
    }
}

/// Only http(s) roots are accepted; a trailing slash is stripped.
fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| AppError::Config(format!("Invalid API_BASE_URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::Config(format!(
            "API_BASE_URL must be http(s), got '{other}'"
        ))),
    }
}
