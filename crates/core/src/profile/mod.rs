//! Profile synchronization domain

pub mod errors;
pub mod ports;
pub mod state;
pub mod synchronizer;

pub use errors::SyncError;
pub use ports::*;
pub use state::{ProfileSnapshot, SyncState, SyncView};
pub use synchronizer::ProfileSynchronizer;
