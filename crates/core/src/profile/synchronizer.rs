//! Profile synchronizer - keeps the local snapshot in step with the store
//!
//! The synchronizer owns the only mutable copy of the profile. The
//! presentation layer observes it through a [`watch`] channel and drives it
//! with [`ProfileSynchronizer::edit`] and [`ProfileSynchronizer::save`].
//!
//! Two rules protect the remote row:
//! - At most one fetch or save runs at a time (the operation gate). Loads
//!   queue behind it; a save that finds it taken is rejected with
//!   [`SyncError::Busy`].
//! - Every identity change bumps the epoch. Results of calls issued under an
//!   older epoch are dropped after the await instead of being adopted.

use std::sync::{Arc, Weak};

use accountsync_domain::constants::{
    MSG_NOT_AUTHENTICATED, MSG_PROFILE_LOAD_FAILED, MSG_PROFILE_SAVED, MSG_PROFILE_SAVE_FAILED,
};
use accountsync_domain::{
    AuthEvent, Identity, Notice, ProfileField, ProfileRecord, ProfileSeed, StoreError,
};
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::errors::SyncError;
use super::ports::ProfileRepository;
use super::state::{ProfileSnapshot, SyncState, SyncView};
use crate::session::events::SubscriptionGuard;
use crate::session::ports::SessionOracle;

/// Auth listener plus its subscription; released together on unmount.
struct Mount {
    listener: JoinHandle<()>,
    _subscription: SubscriptionGuard,
}

impl Drop for Mount {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

struct Inner {
    epoch: u64,
    /// Identity the current snapshot belongs to
    identity: Option<Identity>,
    state: SyncState,
    notice: Option<Notice>,
    mount: Option<Mount>,
}

impl Inner {
    fn reset(&mut self) {
        self.epoch += 1;
        self.identity = None;
        self.state = SyncState::Idle;
        self.notice = None;
    }
}

/// Session-gated profile synchronizer
pub struct ProfileSynchronizer {
    oracle: Arc<dyn SessionOracle>,
    repository: Arc<dyn ProfileRepository>,
    inner: Mutex<Inner>,
    view: watch::Sender<SyncView>,
    op_gate: AsyncMutex<()>,
}

impl ProfileSynchronizer {
    pub fn new(oracle: Arc<dyn SessionOracle>, repository: Arc<dyn ProfileRepository>) -> Self {
        let (view, _) = watch::channel(SyncView::default());
        Self {
            oracle,
            repository,
            inner: Mutex::new(Inner {
                epoch: 0,
                identity: None,
                state: SyncState::Idle,
                notice: None,
                mount: None,
            }),
            view,
            op_gate: AsyncMutex::new(()),
        }
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> SyncView {
        self.view.borrow().clone()
    }

    pub fn state(&self) -> SyncState {
        self.inner.lock().state.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lock().mount.is_some()
    }

    /// Start listening for auth transitions and load the profile of the
    /// current user.
    ///
    /// Mounting an already mounted synchronizer only reloads.
    ///
    /// A sign-in that lands while the initial load is pending takes the load
    /// over; mounting then succeeds and the view turns `Ready` once the
    /// newer load completes.
    ///
    /// # Errors
    /// Returns [`SyncError::NotAuthenticated`] when there is no current user
    /// (the state is then `Idle`), [`SyncError::Stale`] when unmounted or
    /// signed out before the load finished, or the load failure.
    pub async fn mount(self: &Arc<Self>) -> Result<(), SyncError> {
        {
            let mut inner = self.inner.lock();
            if inner.mount.is_none() {
                let (events, guard) = self.oracle.subscribe().split();
                let listener = tokio::spawn(Self::listen(Arc::downgrade(self), events));
                inner.mount = Some(Mount { listener, _subscription: guard });
                info!(epoch = inner.epoch, "profile view mounted");
            }
        }

        match self.load().await {
            Err(SyncError::Stale) if self.superseded_by_reload() => {
                debug!("initial load superseded by a sign-in reload");
                Ok(())
            }
            other => other,
        }
    }

    fn superseded_by_reload(&self) -> bool {
        let inner = self.inner.lock();
        inner.mount.is_some() && !matches!(inner.state, SyncState::Idle)
    }

    /// Release the auth subscription and forget the snapshot. Calls still in
    /// flight resolve into nothing.
    pub fn unmount(&self) {
        let mount = {
            let mut inner = self.inner.lock();
            inner.reset();
            self.publish(&inner);
            inner.mount.take()
        };
        if mount.is_some() {
            info!("profile view unmounted");
        }
        drop(mount);
    }

    async fn listen(this: Weak<Self>, mut events: mpsc::UnboundedReceiver<AuthEvent>) {
        while let Some(event) = events.recv().await {
            let Some(sync) = this.upgrade() else { break };
            sync.handle_auth_event(event);
        }
    }

    /// Apply an auth transition. Events must be handed over in the order
    /// the provider raised them.
    pub fn handle_auth_event(self: &Arc<Self>, event: AuthEvent) {
        let mut inner = self.inner.lock();
        match &event {
            AuthEvent::SignedOut => {
                inner.reset();
                self.publish(&inner);
                info!(epoch = inner.epoch, "signed out; profile cleared");
            }
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                let same_user =
                    inner.identity.as_ref().is_some_and(|current| current.id == session.user.id);
                if same_user {
                    debug!(event = event.name(), user_id = %session.user.id, "auth event for current user");
                    return;
                }

                inner.reset();
                inner.state = SyncState::Loading;
                self.publish(&inner);
                info!(
                    event = event.name(),
                    user_id = %session.user.id,
                    epoch = inner.epoch,
                    "identity changed; reloading profile"
                );
                let epoch = inner.epoch;
                drop(inner);

                let this = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(err) = this.load_at(epoch).await {
                        debug!(error = %err, label = err.label(), "reload after sign-in ended early");
                    }
                });
            }
        }
    }

    /// Fetch the current user's profile, creating it on first access.
    ///
    /// Queues behind any operation already in flight.
    ///
    /// # Errors
    /// [`SyncError::NotAuthenticated`] without a current user,
    /// [`SyncError::Stale`] when the identity changed meanwhile, or the
    /// collaborator failure (the state is then `LoadError`).
    pub async fn load(&self) -> Result<(), SyncError> {
        let epoch = self.inner.lock().epoch;
        self.load_at(epoch).await
    }

    /// Load on behalf of the identity that was current at `epoch`.
    async fn load_at(&self, epoch: u64) -> Result<(), SyncError> {
        let _gate = self.op_gate.lock().await;
        self.ensure_current(epoch)?;

        let identity = match self.oracle.current_user().await {
            Ok(identity) => identity,
            Err(err) => return self.fail_load(epoch, err.into()),
        };
        let Some(identity) = identity else {
            self.transition(epoch, |inner| {
                inner.identity = None;
                inner.state = SyncState::Idle;
                inner.notice = None;
            })?;
            debug!("no current user; profile stays idle");
            return Err(SyncError::NotAuthenticated);
        };

        self.transition(epoch, |inner| {
            inner.identity = Some(identity.clone());
            inner.state = SyncState::Loading;
            inner.notice = None;
        })?;

        match self.fetch_or_create(epoch, &identity).await {
            Ok(record) => {
                let snapshot = ProfileSnapshot::adopted(record.owned_by(&identity));
                self.transition(epoch, |inner| inner.state = SyncState::Ready(snapshot))?;
                info!(user_id = %identity.id, "profile loaded");
                Ok(())
            }
            Err(SyncError::Stale) => {
                debug!(user_id = %identity.id, "discarding stale profile fetch");
                Err(SyncError::Stale)
            }
            Err(err) => self.fail_load(epoch, err),
        }
    }

    async fn fetch_or_create(
        &self,
        epoch: u64,
        identity: &Identity,
    ) -> Result<ProfileRecord, SyncError> {
        debug!(user_id = %identity.id, "fetching profile");
        let found = self.repository.find(&identity.id).await;
        self.ensure_current(epoch)?;
        if let Some(record) = found? {
            return Ok(record);
        }

        info!(user_id = %identity.id, "no profile yet; creating one");
        let created = self.repository.create(&identity.id, ProfileSeed::from(identity)).await;
        self.ensure_current(epoch)?;
        match created {
            Ok(record) => {
                info!(user_id = %identity.id, "profile created");
                Ok(record)
            }
            Err(StoreError::Conflict(reason)) => {
                debug!(user_id = %identity.id, %reason, "profile created concurrently; re-fetching");
                let found = self.repository.find(&identity.id).await;
                self.ensure_current(epoch)?;
                found?.ok_or_else(|| {
                    SyncError::Store(StoreError::Unknown(
                        "profile missing after conflicting create".into(),
                    ))
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn fail_load(&self, epoch: u64, err: SyncError) -> Result<(), SyncError> {
        let reason = err.to_string();
        self.transition(epoch, |inner| {
            inner.state = SyncState::LoadError(reason);
            inner.notice = Some(Notice::error(MSG_PROFILE_LOAD_FAILED));
        })?;
        error!(error = %err, label = err.label(), "profile load failed");
        Err(err)
    }

    /// Edit one field addressed by its column name.
    ///
    /// # Errors
    /// [`SyncError::InvalidField`] for unknown or read-only fields and bad
    /// values, [`SyncError::NotReady`] when there is no snapshot.
    pub fn edit(&self, field: &str, value: &str) -> Result<(), SyncError> {
        let field: ProfileField = field.parse()?;
        self.edit_field(field, value)
    }

    /// Replace one snapshot field. Purely local.
    ///
    /// # Errors
    /// See [`ProfileSynchronizer::edit`].
    pub fn edit_field(&self, field: ProfileField, value: &str) -> Result<(), SyncError> {
        let mut inner = self.inner.lock();
        let snapshot = inner.state.snapshot_mut().ok_or(SyncError::NotReady)?;
        snapshot.edit(field, value)?;
        self.publish(&inner);
        Ok(())
    }

    /// Write the snapshot back for the user who is signed in right now.
    ///
    /// # Errors
    /// - [`SyncError::Busy`] while another fetch or save is in flight
    /// - [`SyncError::NotReady`] without a snapshot
    /// - [`SyncError::NotAuthenticated`] when no user is signed in; nothing
    ///   is written and the snapshot is untouched
    /// - [`SyncError::Stale`] when the signed-in user no longer owns the
    ///   snapshot, or changed before the write resolved
    /// - the store failure (the state is then `SaveError`)
    pub async fn save(&self) -> Result<ProfileRecord, SyncError> {
        let Ok(_gate) = self.op_gate.try_lock() else {
            debug!("save rejected; another profile operation is in flight");
            return Err(SyncError::Busy);
        };

        let (epoch, owner) = {
            let inner = self.inner.lock();
            match &inner.state {
                SyncState::Ready(_) | SyncState::SaveError { .. } => {}
                SyncState::Saving(_) => return Err(SyncError::Busy),
                SyncState::Idle | SyncState::Loading | SyncState::LoadError(_) => {
                    return Err(SyncError::NotReady)
                }
            }
            (inner.epoch, inner.identity.clone())
        };

        let identity = match self.oracle.current_user().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                self.transition(epoch, |inner| {
                    inner.notice = Some(Notice::error(MSG_NOT_AUTHENTICATED));
                })?;
                warn!("save attempted without an authenticated user");
                return Err(SyncError::NotAuthenticated);
            }
            Err(err) => {
                let reason = err.to_string();
                self.transition(epoch, |inner| {
                    if let Some(snapshot) = inner.state.snapshot().cloned() {
                        inner.state = SyncState::SaveError { snapshot, reason };
                    }
                    inner.notice = Some(Notice::error(MSG_PROFILE_SAVE_FAILED));
                })?;
                warn!(error = %err, "could not resolve user before save");
                return Err(err.into());
            }
        };

        if owner.as_ref().map(|owner| &owner.id) != Some(&identity.id) {
            self.transition(epoch, |inner| {
                inner.notice = Some(Notice::error(MSG_PROFILE_SAVE_FAILED));
            })?;
            warn!(user_id = %identity.id, "signed-in user does not own the loaded profile; save refused");
            return Err(SyncError::Stale);
        }

        let (record, sent_revision) = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return Err(SyncError::Stale);
            }
            let snapshot = inner.state.snapshot().cloned().ok_or(SyncError::NotReady)?;
            let mut record = snapshot.record().clone().owned_by(&identity);
            record.updated_at = Some(Utc::now());
            let revision = snapshot.revision();
            inner.state = SyncState::Saving(snapshot);
            inner.notice = None;
            self.publish(&inner);
            (record, revision)
        };

        debug!(user_id = %identity.id, revision = sent_revision, "upserting profile");
        let result = self.repository.upsert(record).await;

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(user_id = %identity.id, "discarding save result for a previous identity");
            return Err(SyncError::Stale);
        }
        let current = inner.state.snapshot().cloned().ok_or(SyncError::Stale)?;

        match result {
            Ok(stored) => {
                let stored = stored.owned_by(&identity);
                let snapshot = if current.revision() == sent_revision {
                    current.confirmed(stored.clone())
                } else {
                    current.confirmed_up_to(sent_revision)
                };
                inner.state = SyncState::Ready(snapshot);
                inner.notice = Some(Notice::success(MSG_PROFILE_SAVED));
                self.publish(&inner);
                info!(user_id = %identity.id, "profile saved");
                Ok(stored)
            }
            Err(err) => {
                inner.state = SyncState::SaveError { snapshot: current, reason: err.to_string() };
                inner.notice = Some(Notice::error(MSG_PROFILE_SAVE_FAILED));
                self.publish(&inner);
                warn!(user_id = %identity.id, error = %err, label = err.label(), "profile save failed");
                Err(err.into())
            }
        }
    }

    /// Sign out through the oracle and clear the local snapshot.
    ///
    /// The snapshot is cleared even when the provider call fails.
    ///
    /// # Errors
    /// Returns the provider failure.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        let result = self.oracle.sign_out().await;
        {
            let mut inner = self.inner.lock();
            inner.reset();
            self.publish(&inner);
        }
        match result {
            Ok(()) => {
                info!("signed out");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "provider sign-out failed; local profile cleared anyway");
                Err(err.into())
            }
        }
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), SyncError> {
        if self.inner.lock().epoch == epoch {
            Ok(())
        } else {
            Err(SyncError::Stale)
        }
    }

    /// Mutate state if no identity change happened since `epoch`.
    fn transition(&self, epoch: u64, apply: impl FnOnce(&mut Inner)) -> Result<(), SyncError> {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return Err(SyncError::Stale);
        }
        apply(&mut inner);
        self.publish(&inner);
        Ok(())
    }

    fn publish(&self, inner: &Inner) {
        self.view.send_replace(SyncView { state: inner.state.clone(), notice: inner.notice.clone() });
    }
}
