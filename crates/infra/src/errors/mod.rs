//! Conversions from external infrastructure errors into domain errors.

mod conversions;

pub use conversions::{provider_error_from_status, InfraError};
