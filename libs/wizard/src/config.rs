use std::env;
use std::time::Duration;
use tracing::warn;

use crate::verification::{CODE_LENGTH, DEMO_CODE};

const DEFAULT_API_URL: &str = "http://localhost:5000/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CODE_DELAY_MS: u64 = 1500;

/// Backend connection settings shared by every host.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token for the signed-in user, if the host has one.
    pub token: Option<String>,
    pub timeout: Duration,
    pub demo_code: String,
    pub demo_code_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            demo_code: DEMO_CODE.to_string(),
            demo_code_delay: Duration::from_millis(DEFAULT_CODE_DELAY_MS),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("API_URL").unwrap_or_else(|_| {
            warn!("API_URL not set, using {}", DEFAULT_API_URL);
            DEFAULT_API_URL.to_string()
        });

        let token = env::var("API_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let timeout_secs = env::var("API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let demo_code = demo_code_or_default(env::var("DEMO_VERIFICATION_CODE").ok());

        let delay_ms = env::var("DEMO_CODE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CODE_DELAY_MS);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout: Duration::from_secs(timeout_secs),
            demo_code,
            demo_code_delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// A demo code the verify step can actually match, or the built-in one.
fn demo_code_or_default(raw: Option<String>) -> String {
    let Some(code) = raw else {
        return DEMO_CODE.to_string();
    };
    if code.len() == CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit()) {
        return code;
    }
    warn!(
        "DEMO_VERIFICATION_CODE must be {} digits, got {:?}; using {}",
        CODE_LENGTH, code, DEMO_CODE
    );
    DEMO_CODE.to_string()
}
