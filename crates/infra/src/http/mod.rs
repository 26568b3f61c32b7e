//! Shared HTTP plumbing for the backend adapters

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
