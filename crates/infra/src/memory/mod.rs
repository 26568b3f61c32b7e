//! In-memory adapters
//!
//! Process-local implementations of the core ports for demos and tests. Both
//! support scripted failures, and the repository can hold calls in flight to
//! reproduce interleavings with auth events.

pub mod oracle;
pub mod repository;

pub use oracle::MemorySessionOracle;
pub use repository::{CallGate, MemoryProfileRepository, RepositoryCall};
