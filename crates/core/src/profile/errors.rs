//! Synchronizer errors

use accountsync_domain::constants::{MSG_NOT_AUTHENTICATED, MSG_UNEXPECTED};
use accountsync_domain::{AuthError, FieldError, Notice, ProviderError, StoreError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No current identity when one was required
    #[error("User not authenticated")]
    NotAuthenticated,

    /// No snapshot to operate on (idle, loading or failed load)
    #[error("Profile is not loaded")]
    NotReady,

    /// Another fetch or save holds the operation gate
    #[error("Another profile operation is in progress")]
    Busy,

    /// The identity changed or the view unmounted while the call was in flight
    #[error("Identity changed during the operation")]
    Stale,

    #[error("Invalid field: {0}")]
    InvalidField(#[from] FieldError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Stable label for logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::NotReady => "not_ready",
            Self::Busy => "busy",
            Self::Stale => "stale",
            Self::InvalidField(_) => "invalid_field",
            Self::Auth(err) => err.label(),
            Self::Provider(err) => err.label(),
            Self::Store(err) => err.label(),
        }
    }

    /// Message for the presentation layer when no operation-specific text
    /// applies.
    pub fn to_notice(&self) -> Notice {
        match self {
            Self::NotAuthenticated => Notice::error(MSG_NOT_AUTHENTICATED),
            Self::InvalidField(err) => Notice::error(err.reason.clone()),
            Self::Busy | Self::NotReady => Notice::error(self.to_string()),
            Self::Stale | Self::Provider(_) => Notice::error(MSG_UNEXPECTED),
            Self::Auth(err) => Notice::error(err.to_string()),
            Self::Store(err) => Notice::error(err.to_string()),
        }
    }
}
