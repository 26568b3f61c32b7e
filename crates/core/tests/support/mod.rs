//! Shared test helpers for `accountsync-core` integration tests.
//!
//! Lightweight fakes for the two ports so tests can focus on behaviour
//! instead of boilerplate.

pub mod fakes;
