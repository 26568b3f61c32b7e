//! # AccountSync Domain
//!
//! Business domain types for the account module.
//!
//! This crate contains:
//! - Identity, session and auth-event types
//! - The profile record and its editable fields
//! - Error taxonomy and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other AccountSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
