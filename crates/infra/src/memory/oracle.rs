//! Process-local identity provider

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use accountsync_core::session::events::{AuthEventHub, AuthSubscription};
use accountsync_core::{OAuthRedirect, SessionOracle};
use accountsync_domain::constants::MIN_PASSWORD_LENGTH;
use accountsync_domain::{AuthError, AuthEvent, Identity, ProviderError, Session};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

const SESSION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

/// In-memory implementation of `SessionOracle`.
///
/// Accounts are registered with [`MemorySessionOracle::sign_up`] or
/// [`MemorySessionOracle::register`]. Tests can also switch the session
/// directly, with or without notifying subscribers.
#[derive(Debug, Default)]
pub struct MemorySessionOracle {
    events: AuthEventHub,
    session: Mutex<Option<Session>>,
    accounts: Mutex<HashMap<String, Account>>,
    session_failures: Mutex<VecDeque<ProviderError>>,
    pending_oauth: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl MemorySessionOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle already holding a session for `identity`.
    pub fn signed_in(identity: Identity) -> Self {
        let oracle = Self::default();
        let session = oracle.issue(identity);
        oracle.set_session(Some(session));
        oracle
    }

    /// Add an account without going through sign-up.
    pub fn register(&self, email: &str, password: &str) -> Identity {
        let identity = Identity::new(Uuid::new_v4().to_string(), Some(email.to_string()));
        self.accounts.lock().insert(
            email.to_string(),
            Account { password: password.to_string(), identity: identity.clone() },
        );
        identity
    }

    /// New session for `identity` with a fresh access token.
    pub fn issue(&self, identity: Identity) -> Session {
        let token = format!("memory-token-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let refresh = format!("{token}-refresh");
        Session::new(token, Some(refresh), SESSION_LIFETIME_SECS, identity)
    }

    /// Replace the session without telling subscribers, as when a token
    /// silently expires.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock() = session;
    }

    /// Replace the session and publish `SignedIn` or `SignedOut`.
    pub fn switch_to(&self, session: Option<Session>) {
        self.set_session(session.clone());
        self.events.publish(session.map_or(AuthEvent::SignedOut, AuthEvent::SignedIn));
    }

    /// Rotate the access token of the current session and publish
    /// `TokenRefreshed`. Returns `None` when nobody is signed in.
    pub fn refresh(&self) -> Option<Session> {
        let identity = self.session.lock().as_ref().map(|session| session.user.clone())?;
        let session = self.issue(identity);
        self.set_session(Some(session.clone()));
        self.events.publish(AuthEvent::TokenRefreshed(session.clone()));
        Some(session)
    }

    /// Fail the next session lookup with `err`.
    pub fn fail_next_session(&self, err: ProviderError) {
        self.session_failures.lock().push_back(err);
    }

    pub fn events(&self) -> &AuthEventHub {
        &self.events
    }

    fn signed_in_as(&self, identity: Identity) -> Session {
        let session = self.issue(identity);
        info!(user_id = %session.user_id(), "memory oracle signed in");
        self.switch_to(Some(session.clone()));
        session
    }
}

#[async_trait]
impl SessionOracle for MemorySessionOracle {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        tokio::task::yield_now().await;
        if let Some(err) = self.session_failures.lock().pop_front() {
            return Err(err);
        }
        Ok(self.session.lock().clone())
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let account = self.accounts.lock().get(email).cloned();
        match account {
            Some(account) if account.password == password => {
                Ok(self.signed_in_as(account.identity))
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError> {
        *self.pending_oauth.lock() = Some(provider.to_string());
        Ok(OAuthRedirect {
            provider: provider.to_string(),
            url: format!("memory://authorize?provider={}", urlencoding::encode(provider)),
        })
    }

    async fn complete_oauth(&self, code: &str) -> Result<Session, AuthError> {
        let provider = self.pending_oauth.lock().take().ok_or_else(|| {
            AuthError::MissingCredentials("no OAuth sign-in in progress".into())
        })?;
        debug!(provider = %provider, "memory oauth completed");
        Ok(self.signed_in_as(Identity::new(format!("{provider}:{code}"), None)))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakSecret(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters."
            )));
        }
        if self.accounts.lock().contains_key(email) {
            return Err(AuthError::AlreadyRegistered);
        }
        Ok(self.register(email, password))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.switch_to(None);
        Ok(())
    }
}
