//! HashMap-backed profile repository

use std::collections::{HashMap, VecDeque};

use accountsync_core::ProfileRepository;
use accountsync_domain::{ProfileRecord, ProfileSeed, StoreError, UserId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// Repository operations that can be counted, failed or held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryCall {
    Find,
    Create,
    Upsert,
}

/// Keeps calls of one kind waiting until released or dropped.
#[derive(Debug)]
pub struct CallGate {
    open: watch::Sender<bool>,
}

impl CallGate {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for CallGate {
    fn drop(&mut self) {
        self.open.send_replace(true);
    }
}

/// In-memory implementation of `ProfileRepository`.
///
/// `create` reports a `Conflict` when the row already exists, like a store
/// with a primary key on `id`.
#[derive(Debug, Default)]
pub struct MemoryProfileRepository {
    rows: Mutex<HashMap<UserId, ProfileRecord>>,
    calls: Mutex<HashMap<RepositoryCall, usize>>,
    failures: Mutex<HashMap<RepositoryCall, VecDeque<StoreError>>>,
    gates: Mutex<HashMap<RepositoryCall, watch::Receiver<bool>>>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `records`.
    pub fn with_rows(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        let repository = Self::default();
        for record in records {
            repository.insert(record);
        }
        repository
    }

    pub fn row(&self, id: &UserId) -> Option<ProfileRecord> {
        self.rows.lock().get(id).cloned()
    }

    pub fn insert(&self, record: ProfileRecord) {
        self.rows.lock().insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Number of calls of `call` that have started, including held ones.
    pub fn calls(&self, call: RepositoryCall) -> usize {
        self.calls.lock().get(&call).copied().unwrap_or(0)
    }

    /// Fail the next `call` with `err`. Queued failures are used in order.
    pub fn fail_next(&self, call: RepositoryCall, err: StoreError) {
        self.failures.lock().entry(call).or_default().push_back(err);
    }

    /// Hold every `call` that starts from now on until the gate is released.
    #[must_use = "dropping the gate releases held calls immediately"]
    pub fn hold(&self, call: RepositoryCall) -> CallGate {
        let (open, rx) = watch::channel(false);
        self.gates.lock().insert(call, rx);
        CallGate { open }
    }

    async fn enter(&self, call: RepositoryCall) -> Result<(), StoreError> {
        *self.calls.lock().entry(call).or_default() += 1;

        let gate = self.gates.lock().get(&call).cloned();
        if let Some(mut gate) = gate {
            // A dropped sender has already sent `true`
            let _ = gate.wait_for(|open| *open).await;
        } else {
            tokio::task::yield_now().await;
        }

        match self.failures.lock().get_mut(&call).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn find(&self, id: &UserId) -> Result<Option<ProfileRecord>, StoreError> {
        self.enter(RepositoryCall::Find).await?;
        let row = self.row(id);
        debug!(user_id = %id, found = row.is_some(), "memory profile lookup");
        Ok(row)
    }

    async fn create(&self, id: &UserId, seed: ProfileSeed) -> Result<ProfileRecord, StoreError> {
        self.enter(RepositoryCall::Create).await?;

        let mut rows = self.rows.lock();
        if rows.contains_key(id) {
            return Err(StoreError::Conflict(format!(
                "duplicate key value violates unique constraint (id={id})"
            )));
        }
        let record = ProfileRecord::seeded(id.clone(), seed, Utc::now());
        rows.insert(id.clone(), record.clone());
        debug!(user_id = %id, "memory profile created");
        Ok(record)
    }

    async fn upsert(&self, record: ProfileRecord) -> Result<ProfileRecord, StoreError> {
        self.enter(RepositoryCall::Upsert).await?;
        self.insert(record.clone());
        debug!(user_id = %record.id, "memory profile upserted");
        Ok(record)
    }
}
