//! Environment-driven configuration.
//!
//! Every value is resolved lazily at first use so a missing key only fails
//! the code path that needs it. The generation API key is required with no
//! embedded fallback.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{RadarError, Result};

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_CACHE_DIR: &str = "RADAR_CACHE_DIR";

fn required(name: &'static str) -> Result<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RadarError::MissingEnv { name: name.into() }),
    }
}

pub fn gemini_api_key() -> Result<String> {
    required(ENV_GEMINI_API_KEY)
}

pub fn supabase_url() -> Result<String> {
    // Trailing slash would double up when joining REST paths.
    required(ENV_SUPABASE_URL).map(|u| u.trim_end_matches('/').to_string())
}

pub fn supabase_anon_key() -> Result<String> {
    required(ENV_SUPABASE_ANON_KEY)
}

/// Cache root for the three pipeline slots. Overridable so tests and
/// multi-instance deployments don't collide on the OS temp dir.
pub fn cache_dir() -> PathBuf {
    env::var(ENV_CACHE_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir())
}

/// Outbound HTTP tuning shared by the feed fetcher, the generation client,
/// and the store client. The upstream system had no timeouts at all; these
/// defaults keep a stalled endpoint from hanging a request forever.
#[derive(Debug, Clone, Copy)]
pub struct HttpTuning {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Attempts for the generation call. 1 = single attempt (upstream
    /// behavior); >1 retries connect failures and 429/5xx with a doubling
    /// sleep.
    pub max_attempts: u8,
}

impl Default for HttpTuning {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
            max_attempts: 1,
        }
    }
}

impl HttpTuning {
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            connect_timeout: secs_var("RADAR_CONNECT_TIMEOUT_SECS")
                .unwrap_or(base.connect_timeout),
            timeout: secs_var("RADAR_HTTP_TIMEOUT_SECS").unwrap_or(base.timeout),
            max_attempts: env::var("RADAR_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n >= 1)
                .unwrap_or(base.max_attempts),
        }
    }

    pub fn client(&self, user_agent: &str) -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()
            .expect("reqwest client")
    }
}

fn secs_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

pub const USER_AGENT: &str = "hn-problem-radar/0.1 (+https://github.com/hn-problem-radar)";
