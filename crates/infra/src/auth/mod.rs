//! Identity provider adapter
//!
//! - [`gotrue`]: GoTrue-compatible HTTP implementation of `SessionOracle`
//! - [`storage`]: where the current session survives between calls

pub mod gotrue;
pub mod storage;

use async_trait::async_trait;
use accountsync_domain::ProviderError;

pub use gotrue::GoTrueSessionOracle;
pub use storage::{MemorySessionStorage, SessionStorage};

/// Trait for providing access tokens
///
/// Lets the store adapter act as the signed-in user without knowing how
/// sessions are obtained or refreshed.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A valid access token, or `None` when nobody is signed in.
    ///
    /// Implementations refresh the token first if it is about to expire.
    async fn access_token(&self) -> Result<Option<String>, ProviderError>;
}
