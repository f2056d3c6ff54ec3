//! Runtime configuration loaded from the environment
//!
//! All values have defaults so the server starts with an empty environment;
//! only the free tier needs `GEMINI_API_KEY` (or `MOCK_API`) to do real work.

use std::env;
use std::time::Duration;

/// Maximum number of characters accepted in a transformation request
pub const MAX_TEXT_LENGTH: usize = 300;

/// Daily free-tier cap enforced by the server for the web client
pub const WEB_DAILY_LIMIT: u32 = 40;

/// Daily cap the browser extension tracks on its own side
pub const EXTENSION_DAILY_LIMIT: u32 = 20;

/// Server configuration
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to the redb file (default: "data.db")
/// - `GEMINI_API_KEY` - Operator key used for the free tier
/// - `MOCK_API` - When "true" or "1", vendor calls are replaced by a canned echo
/// - `FREE_DAILY_LIMIT` - Per-IP free requests per UTC day (default: 40)
/// - `PROVIDER_TIMEOUT_SECS` - Upper bound for one vendor call (default: 30)
/// - `AUTHORIZATION` - Shared secret for history, analytics and style creation
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub gemini_api_key: Option<String>,
    pub mock_api: bool,
    pub free_daily_limit: u32,
    pub provider_timeout: Duration,
    pub auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            gemini_api_key: None,
            mock_api: false,
            free_daily_limit: WEB_DAILY_LIMIT,
            provider_timeout: Duration::from_secs(30),
            auth_token: None,
        }
    }
}

impl Config {
    /// Reads the configuration from process environment variables
    ///
    /// Unparseable numbers fall back to their defaults; empty strings are
    /// treated the same as unset variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_var("PORT").unwrap_or(defaults.port),
            database_url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_url),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            mock_api: non_empty_var("MOCK_API")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
            free_daily_limit: parse_var("FREE_DAILY_LIMIT").unwrap_or(defaults.free_daily_limit),
            provider_timeout: parse_var("PROVIDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            auth_token: non_empty_var("AUTHORIZATION"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    non_empty_var(name).and_then(|v| v.trim().parse().ok())
}
