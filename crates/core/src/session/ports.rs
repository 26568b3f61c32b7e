//! Port interfaces for the identity provider
//!
//! The core never stores sessions itself. It asks the oracle on demand and
//! reacts to the transitions delivered through [`SessionOracle::subscribe`].

use async_trait::async_trait;
use accountsync_domain::{AuthError, Identity, ProviderError, Session};
use serde::{Deserialize, Serialize};

use super::events::AuthSubscription;

/// External redirect that starts an OAuth sign-in.
///
/// The sign-in completes later, when the provider redirects back with an
/// authorization code and a `SignedIn` event is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRedirect {
    pub provider: String,
    pub url: String,
}

/// Trait wrapping the identity provider
#[async_trait]
pub trait SessionOracle: Send + Sync {
    /// Current session, if any
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Identity of the current session, if any
    async fn current_user(&self) -> Result<Option<Identity>, ProviderError> {
        Ok(self.current_session().await?.map(|session| session.user))
    }

    /// Register for auth-state transitions. Dropping the subscription
    /// unregisters it.
    fn subscribe(&self) -> AuthSubscription;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Build the redirect for an OAuth provider (`google`, `azure`)
    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError>;

    /// Exchange the authorization code from the OAuth callback
    async fn complete_oauth(&self, code: &str) -> Result<Session, AuthError>;

    /// Register a new principal. Does not imply being signed in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}
