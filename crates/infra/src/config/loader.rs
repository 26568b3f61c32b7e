//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file into the process environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If a required variable is missing, falls back to loading from file
//! 4. Probes multiple paths for config files (JSON and TOML)
//! 5. Validates the result
//!
//! ## Environment Variables
//! - `ACCOUNTSYNC_BACKEND_URL`: Backend base URL (required)
//! - `ACCOUNTSYNC_ANON_KEY`: Public API key (required)
//! - `ACCOUNTSYNC_REDIRECT_URL`: OAuth redirect target
//! - `ACCOUNTSYNC_PROFILES_TABLE`: Profile table name (default `profiles`)
//! - `ACCOUNTSYNC_HTTP_TIMEOUT`: Request timeout in seconds
//! - `ACCOUNTSYNC_HTTP_MAX_ATTEMPTS`: Attempts per request
//! - `ACCOUNTSYNC_REFRESH_THRESHOLD`: Seconds before expiry to refresh
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./accountsync.json` or `./accountsync.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use accountsync_domain::{AccountError, Config, Result};

pub const ENV_BACKEND_URL: &str = "ACCOUNTSYNC_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "ACCOUNTSYNC_ANON_KEY";
pub const ENV_REDIRECT_URL: &str = "ACCOUNTSYNC_REDIRECT_URL";
pub const ENV_PROFILES_TABLE: &str = "ACCOUNTSYNC_PROFILES_TABLE";
pub const ENV_HTTP_TIMEOUT: &str = "ACCOUNTSYNC_HTTP_TIMEOUT";
pub const ENV_HTTP_MAX_ATTEMPTS: &str = "ACCOUNTSYNC_HTTP_MAX_ATTEMPTS";
pub const ENV_REFRESH_THRESHOLD: &str = "ACCOUNTSYNC_REFRESH_THRESHOLD";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `AccountError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<Config> {
    load_dotenv();

    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Merge a `.env` file into the process environment, if one exists.
///
/// Variables already set in the environment win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }
}

/// Load configuration from environment variables
///
/// The backend URL and anon key must be present; every other setting falls
/// back to its default.
///
/// # Errors
/// Returns `AccountError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.backend.url = env_var(ENV_BACKEND_URL)?;
    config.backend.anon_key = env_var(ENV_ANON_KEY)?;
    config.auth.redirect_url = std::env::var(ENV_REDIRECT_URL).ok().filter(|s| !s.is_empty());

    if let Ok(table) = std::env::var(ENV_PROFILES_TABLE) {
        config.store.profiles_table = table;
    }
    if let Some(timeout) = env_parse(ENV_HTTP_TIMEOUT)? {
        config.http.timeout_seconds = timeout;
    }
    if let Some(attempts) = env_parse(ENV_HTTP_MAX_ATTEMPTS)? {
        config.http.max_attempts = attempts;
    }
    if let Some(threshold) = env_parse(ENV_REFRESH_THRESHOLD)? {
        config.auth.refresh_threshold_seconds = threshold;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `AccountError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AccountError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AccountError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AccountError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AccountError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AccountError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(AccountError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("accountsync.json"),
        dir.join("accountsync.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `AccountError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AccountError::Config(format!("Missing required environment variable: {}", key))),
    }
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `AccountError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AccountError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}
