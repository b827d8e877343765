//! Typed messages for both listeners.

pub mod client;
pub mod game;

pub use client::{
    AccountLogin, AuthResult, AuthResultWithString, ClientVersion, PublicKeyOffer, SealedAesKey,
    SelectServer, SelectServerResult, ServerInfo, ServerList,
};
pub use game::{
    AccountNotice, ClientLogin, ClientLoginResult, ClientLogout, GameLogin, GameLoginResult,
    SecurityNoCheck,
};
