//! Modular common utilities shared across AccountSync crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: credential and field validation
//! - `platform`: OAuth redirect helpers (PKCE)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod validation;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod auth;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::PkceChallenge;
#[cfg(feature = "foundation")]
pub use validation::{
    CredentialRules, FieldValidator, StringValidator, ValidationError, ValidationResult,
};
