//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;

use accountsync_domain::AccountError;
use accountsync_infra::config;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "backend": {
            "url": "https://demo.supabase.co",
            "anon_key": "anon-key-123"
        },
        "auth": {
            "redirect_url": "https://app.example.com/profile",
            "refresh_threshold_seconds": 120,
            "min_password_length": 8
        },
        "store": {
            "profiles_table": "user_profiles"
        }
    }"#;

    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(json_content.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension("json");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let config = config::load_from_file(Some(path.clone())).expect("config should load");

    assert_eq!(config.backend.url, "https://demo.supabase.co");
    assert_eq!(config.backend.anon_key, "anon-key-123");
    assert_eq!(config.auth.redirect_url.as_deref(), Some("https://app.example.com/profile"));
    assert_eq!(config.auth.refresh_threshold_seconds, 120);
    assert_eq!(config.auth.min_password_length, 8);
    assert_eq!(config.store.profiles_table, "user_profiles");
    // Section not present in the file keeps its defaults
    assert_eq!(config.http.max_attempts, 3);
    assert!(config.validate().is_ok());

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_load_config_from_toml_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("accountsync.toml");
    std::fs::write(
        &path,
        r#"
[backend]
url = "https://demo.supabase.co"
anon_key = "anon"

[http]
timeout_seconds = 5
max_attempts = 1
base_backoff_ms = 0
"#,
    )
    .expect("write config");

    let config = config::load_from_file(Some(path)).expect("config should load");

    assert_eq!(config.http.timeout_seconds, 5);
    assert_eq!(config.http.max_attempts, 1);
    assert_eq!(config.http.base_backoff_ms, 0);
    assert_eq!(config.store.profiles_table, "profiles");
}

#[test]
fn test_load_config_with_minimal_fields() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").expect("write config");

    let config = config::load_from_file(Some(path)).expect("empty object is a valid file");

    // Loads, but cannot reach a backend
    assert!(matches!(config.validate(), Err(AccountError::Config(msg)) if msg.contains("backend.url")));
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some("/nonexistent/accountsync.json".into()));

    assert!(matches!(result, Err(AccountError::Config(msg)) if msg.contains("not found")));
}

#[test]
fn test_load_config_with_invalid_format() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ this is not json").expect("write config");

    let result = config::load_from_file(Some(path));

    assert!(matches!(result, Err(AccountError::Config(msg)) if msg.contains("Invalid JSON")));
}
