//! Profile record store adapters

pub mod postgrest;

pub use postgrest::PostgrestProfileRepository;
