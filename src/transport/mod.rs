//! # Transport Layer
//!
//! TCP listeners and per-connection plumbing.

pub mod connection;
pub mod server;

pub use connection::{CloseReason, Connection, ConnectionId, Link};
pub use server::Listener;
