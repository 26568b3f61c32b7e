//! Login and sign-up flow

pub mod flow;

pub use flow::AuthFlow;
