//! # Protocol Layer
//!
//! Message definitions and the two connection state machines.
//!
//! ## Components
//! - **Codes / Message**: wire constants and the typed-message trait
//! - **Packets**: schemas and typed messages for both listeners
//! - **Version**: epoch inference from build dates and frame shapes
//! - **Handshake**: DES and AES password decryption, RSA session keys
//! - **Registry**: live players and game servers
//! - **Dispatcher**: the handler interface the listener drives
//! - **Auth / Game**: the client-facing and game-server-facing handlers

pub mod auth;
pub mod codes;
pub mod dispatcher;
pub mod game;
pub mod handshake;
pub mod message;
pub mod packets;
pub mod registry;
pub mod version;

#[cfg(test)]
mod tests;
