//! Session persistence

use accountsync_domain::Session;
use parking_lot::Mutex;

/// Where the session oracle keeps the current session.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn store(&self, session: &Session);
    fn clear(&self);
}

/// Process-local storage; the session is lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that starts out holding `session` (a restored login).
    pub fn with_session(session: Session) -> Self {
        Self { slot: Mutex::new(Some(session)) }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Option<Session> {
        self.slot.lock().clone()
    }

    fn store(&self, session: &Session) {
        *self.slot.lock() = Some(session.clone());
    }

    fn clear(&self) {
        *self.slot.lock() = None;
    }
}
