//! Configuration structures
//!
//! Loaded by `accountsync-infra::config` from the environment or a JSON/TOML
//! file. Every section has defaults so partial files are accepted.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PROFILES_TABLE, DEFAULT_REFRESH_THRESHOLD_SECS, MIN_PASSWORD_LENGTH};
use crate::errors::{AccountError, Result};

/// Root application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Reject configurations that cannot reach the backend.
    ///
    /// # Errors
    /// Returns `AccountError::Config` naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.backend.url.trim().is_empty() {
            return Err(AccountError::Config("backend.url must not be empty".into()));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(AccountError::Config("backend.anon_key must not be empty".into()));
        }
        if self.store.profiles_table.trim().is_empty() {
            return Err(AccountError::Config("store.profiles_table must not be empty".into()));
        }
        if self.http.max_attempts == 0 {
            return Err(AccountError::Config("http.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Hosted backend serving both the auth and the REST endpoints.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Public (anon) API key sent as the `apikey` header
    pub anon_key: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &if self.anon_key.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where OAuth providers redirect after consent
    pub redirect_url: Option<String>,
    /// Refresh sessions this many seconds before expiry
    pub refresh_threshold_seconds: i64,
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            redirect_url: None,
            refresh_threshold_seconds: DEFAULT_REFRESH_THRESHOLD_SECS,
            min_password_length: MIN_PASSWORD_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub profiles_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { profiles_table: DEFAULT_PROFILES_TABLE.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    /// Total attempts per request (initial try + retries)
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30, max_attempts: 3, base_backoff_ms: 200 }
    }
}
