//! Error types used throughout the application
//!
//! The taxonomy follows the collaborator boundaries: the identity provider
//! fails with [`AuthError`] or [`ProviderError`], the record store fails with
//! [`StoreError`]. A missing profile row is not an error; repositories return
//! `Ok(None)` for it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the identity provider for credential operations.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Weak password: {0}")]
    WeakSecret(String),

    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The provider could not be reached or answered unintelligibly.
    #[error(transparent)]
    Transport(#[from] ProviderError),

    #[error("{0}")]
    Unknown(String),
}

impl AuthError {
    /// Stable label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AlreadyRegistered => "already_registered",
            Self::WeakSecret(_) => "weak_secret",
            Self::RateLimited => "rate_limited",
            Self::MissingCredentials(_) => "missing_credentials",
            Self::Unsupported(_) => "unsupported",
            Self::Transport(_) => "transport",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Transport-level failures talking to the identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ProviderError {
    #[error("Identity provider unreachable: {0}")]
    Unreachable(String),

    #[error("Identity provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Stable label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "provider_unreachable",
            Self::Unknown(_) => "provider_unknown",
        }
    }
}

/// Failures reported by the profile record store.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StoreError {
    /// Another writer inserted the row first.
    #[error("Profile already exists: {0}")]
    Conflict(String),

    /// The acting session does not own the row.
    #[error("Not authorized to write profile: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Stable label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Conflict(_) => "store_conflict",
            Self::Unauthorized(_) => "store_unauthorized",
            Self::Unknown(_) => "store_unknown",
        }
    }
}

impl From<ProviderError> for StoreError {
    fn from(err: ProviderError) -> Self {
        Self::Unknown(err.to_string())
    }
}

/// Umbrella error for callers that do not care which collaborator failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AccountError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for account operations
pub type Result<T> = std::result::Result<T, AccountError>;
