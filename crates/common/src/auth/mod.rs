//! OAuth redirect helpers
//!
//! - **[`pkce`]**: verifier/challenge generation for the authorization-code
//!   exchange that completes an OAuth sign-in

pub mod pkce;

pub use pkce::{generate_code_challenge, generate_code_verifier, PkceChallenge};
