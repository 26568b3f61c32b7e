//! Domain types and models

pub mod identity;
pub mod notice;
pub mod profile;

pub use identity::{AuthEvent, Identity, Session, UserId};
pub use notice::{Notice, Severity};
pub use profile::{FieldError, Gender, ProfileField, ProfileRecord, ProfileSeed};
