//! Observable synchronizer state

use accountsync_domain::{FieldError, Notice, ProfileField, ProfileRecord};

/// Local editable mirror of a profile row.
///
/// `revision` counts local edits since the snapshot was adopted;
/// `saved_revision` is the revision last confirmed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    record: ProfileRecord,
    revision: u64,
    saved_revision: u64,
}

impl ProfileSnapshot {
    /// Snapshot of a record exactly as the store holds it.
    pub fn adopted(record: ProfileRecord) -> Self {
        Self { record, revision: 0, saved_revision: 0 }
    }

    pub fn record(&self) -> &ProfileRecord {
        &self.record
    }

    pub fn get(&self, field: ProfileField) -> String {
        self.record.get(field)
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Local edits not yet confirmed by the store
    pub const fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub(crate) fn edit(&mut self, field: ProfileField, value: &str) -> Result<(), FieldError> {
        self.record.set(field, value)?;
        self.revision += 1;
        Ok(())
    }

    /// Replace with the stored record, keeping the revision counter moving.
    pub(crate) fn confirmed(self, stored: ProfileRecord) -> Self {
        Self { record: stored, revision: self.revision, saved_revision: self.revision }
    }

    /// Keep local edits made after `revision` was sent to the store.
    pub(crate) fn confirmed_up_to(self, revision: u64) -> Self {
        Self { saved_revision: revision, ..self }
    }
}

/// Synchronizer state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No authenticated user (or not mounted)
    #[default]
    Idle,
    Loading,
    Ready(ProfileSnapshot),
    Saving(ProfileSnapshot),
    LoadError(String),
    /// Last save failed; the snapshot is what the user was editing
    SaveError { snapshot: ProfileSnapshot, reason: String },
}

impl SyncState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Saving(_) => "saving",
            Self::LoadError(_) => "load_error",
            Self::SaveError { .. } => "save_error",
        }
    }

    pub const fn snapshot(&self) -> Option<&ProfileSnapshot> {
        match self {
            Self::Ready(snapshot) | Self::Saving(snapshot) | Self::SaveError { snapshot, .. } => {
                Some(snapshot)
            }
            Self::Idle | Self::Loading | Self::LoadError(_) => None,
        }
    }

    pub(crate) fn snapshot_mut(&mut self) -> Option<&mut ProfileSnapshot> {
        match self {
            Self::Ready(snapshot) | Self::Saving(snapshot) | Self::SaveError { snapshot, .. } => {
                Some(snapshot)
            }
            Self::Idle | Self::Loading | Self::LoadError(_) => None,
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// What the presentation layer renders: state plus the latest message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncView {
    pub state: SyncState,
    pub notice: Option<Notice>,
}
