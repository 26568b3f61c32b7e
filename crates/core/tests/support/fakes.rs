//! Fake collaborators for core tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use accountsync_core::session::events::{AuthEventHub, AuthSubscription};
use accountsync_core::{OAuthRedirect, ProfileRepository, SessionOracle};
use accountsync_domain::{
    AuthError, AuthEvent, Identity, ProfileRecord, ProfileSeed, ProviderError, Session,
    StoreError, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

/// Oracle whose current session is set directly by the test.
#[derive(Default)]
pub struct FakeOracle {
    pub hub: AuthEventHub,
    session: Mutex<Option<Session>>,
    pub sign_in_result: Mutex<Option<AuthError>>,
    pub sign_up_result: Mutex<Option<AuthError>>,
}

impl FakeOracle {
    pub fn signed_in(id: &str, email: &str) -> Arc<Self> {
        let oracle = Self::default();
        *oracle.session.lock() = Some(session(id, email));
        Arc::new(oracle)
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Change the session without telling subscribers.
    pub fn set_session(&self, value: Option<Session>) {
        *self.session.lock() = value;
    }

    /// Change the session and publish the matching event.
    pub fn switch_to(&self, value: Option<Session>) {
        self.set_session(value.clone());
        self.hub.publish(value.map_or(AuthEvent::SignedOut, AuthEvent::SignedIn));
    }
}

pub fn session(id: &str, email: &str) -> Session {
    Session::new(format!("token-{id}"), None, 3600, Identity::new(id, Some(email.to_string())))
}

#[async_trait]
impl SessionOracle for FakeOracle {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.session.lock().clone())
    }

    fn subscribe(&self) -> AuthSubscription {
        self.hub.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, AuthError> {
        if let Some(err) = self.sign_in_result.lock().clone() {
            return Err(err);
        }
        let session = session("u-password", email);
        self.switch_to(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError> {
        Ok(OAuthRedirect {
            provider: provider.to_string(),
            url: format!("https://auth.test/authorize?provider={provider}"),
        })
    }

    async fn complete_oauth(&self, code: &str) -> Result<Session, AuthError> {
        if code == "bad" {
            return Err(AuthError::InvalidCredentials);
        }
        let session = session("u-oauth", "oauth@x.com");
        self.switch_to(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<Identity, AuthError> {
        match self.sign_up_result.lock().clone() {
            Some(err) => Err(err),
            None => Ok(Identity::new("u-new", Some(email.to_string()))),
        }
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.switch_to(None);
        Ok(())
    }
}

/// HashMap-backed repository counting calls per operation.
#[derive(Default)]
pub struct FakeRepository {
    rows: Mutex<HashMap<UserId, ProfileRecord>>,
    pub finds: AtomicUsize,
    pub creates: AtomicUsize,
    pub upserts: AtomicUsize,
    pub fail_upsert: Mutex<Option<StoreError>>,
}

impl FakeRepository {
    pub fn row(&self, id: &str) -> Option<ProfileRecord> {
        self.rows.lock().get(&UserId::new(id)).cloned()
    }

    pub fn insert(&self, record: ProfileRecord) {
        self.rows.lock().insert(record.id.clone(), record);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileRepository for FakeRepository {
    async fn find(&self, id: &UserId) -> Result<Option<ProfileRecord>, StoreError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.rows.lock().get(id).cloned())
    }

    async fn create(&self, id: &UserId, seed: ProfileSeed) -> Result<ProfileRecord, StoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let mut rows = self.rows.lock();
        if rows.contains_key(id) {
            return Err(StoreError::Conflict("duplicate key value violates unique constraint".into()));
        }
        let record = ProfileRecord::seeded(id.clone(), seed, Utc::now());
        rows.insert(id.clone(), record.clone());
        Ok(record)
    }

    async fn upsert(&self, record: ProfileRecord) -> Result<ProfileRecord, StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(err) = self.fail_upsert.lock().clone() {
            return Err(err);
        }
        self.rows.lock().insert(record.id.clone(), record.clone());
        Ok(record)
    }
}
