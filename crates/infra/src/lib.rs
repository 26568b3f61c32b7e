//! # AccountSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - GoTrue-compatible session oracle
//! - PostgREST profile repository
//! - Retrying HTTP client
//! - Configuration loading and tracing setup
//! - In-memory adapters for demos and tests
//!
//! ## Architecture
//! - Implements traits defined in `accountsync-core`
//! - Depends on `accountsync-common`, `accountsync-domain` and `accountsync-core`
//! - Contains all "impure" code (network, environment, files)

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod memory;
pub mod observability;
pub mod store;

// Re-export commonly used items
pub use auth::{AccessTokenProvider, GoTrueSessionOracle, MemorySessionStorage, SessionStorage};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use memory::{MemoryProfileRepository, MemorySessionOracle};
pub use observability::{init_tracing, LogFormat};
pub use store::PostgrestProfileRepository;
