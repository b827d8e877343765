//! # Service Layer
//!
//! The account store seam and the engine running both listeners.

pub mod accounts;
pub mod engine;

pub use accounts::{Account, AccountStore, MemoryAccountStore};
pub use engine::{Engine, ShutdownHandle, ShutdownReason};
