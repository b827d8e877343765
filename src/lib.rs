//! # mononoke
//!
//! Login and session-handoff tier for a legacy MMO wire protocol.
//!
//! Clients connect to the client listener, announce their build, exchange
//! keys, log in and pick a game server. The auth side hands them a
//! one-time key which the chosen game server, connected on the game
//! listener, redeems to admit the client.
//!
//! ## Layout
//! - [`core`]: epochs, schema codec, framing
//! - [`protocol`]: messages, handlers, registries
//! - [`transport`]: listeners and connections
//! - [`service`]: account store and engine
//! - [`utils`]: stream cipher, logging, metrics

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::Config;
pub use error::{ProtocolError, Result};
