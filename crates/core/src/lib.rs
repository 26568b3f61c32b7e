//! # AccountSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the identity provider and the profile store
//! - The auth event hub backing provider subscriptions
//! - The profile synchronizer state machine
//! - The login/sign-up flow
//!
//! ## Architecture Principles
//! - Only depends on `accountsync-common` and `accountsync-domain`
//! - No HTTP or platform code
//! - All external collaborators via traits

pub mod auth;
pub mod profile;
pub mod session;

// Re-export specific items to avoid ambiguity
pub use auth::AuthFlow;
pub use profile::ports::ProfileRepository;
pub use profile::{ProfileSnapshot, ProfileSynchronizer, SyncError, SyncState, SyncView};
pub use session::events::{AuthEventHub, AuthSubscription, SubscriptionGuard};
pub use session::ports::{OAuthRedirect, SessionOracle};
