//! Port interfaces for profile persistence
//!
//! These traits define the boundaries between core business logic
//! and the remote record store.

use async_trait::async_trait;
use accountsync_domain::{ProfileRecord, ProfileSeed, StoreError, UserId};

/// Trait for the identity-keyed profile collection
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Get the profile row for `id`. A missing row is `Ok(None)`.
    async fn find(&self, id: &UserId) -> Result<Option<ProfileRecord>, StoreError>;

    /// Insert a minimal row for `id`. Fails with [`StoreError::Conflict`]
    /// when the row already exists.
    async fn create(&self, id: &UserId, seed: ProfileSeed) -> Result<ProfileRecord, StoreError>;

    /// Insert or replace the row keyed by `record.id`, returning what the
    /// store now holds.
    async fn upsert(&self, record: ProfileRecord) -> Result<ProfileRecord, StoreError>;
}
