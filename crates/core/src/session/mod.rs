//! Session observation: the identity-provider port and its event fan-out

pub mod events;
pub mod ports;

pub use events::*;
pub use ports::*;
