//! # Error Types
//!
//! Error handling for the login tier.
//!
//! ## Error Categories
//! - **I/O Errors**: socket read/write failures, always fatal to one connection
//! - **Codec Errors**: schema violations found while decoding or encoding a record
//! - **Framing Errors**: checksum mismatch, impossible frame sizes
//! - **State Errors**: a message arrived in a state that does not permit it
//! - **Cryptographic Errors**: bad public keys, cipher failures
//! - **Store Errors**: the account store could not answer
//!
//! Business-rule failures (bad credentials, unknown server, too young) are
//! not errors at this level; handlers answer them with a result code.
//!
//! ## Example Usage
//! ```rust
//! use mononoke::error::{ProtocolError, Result};
//!
//! fn require_login(authenticated: bool) -> Result<()> {
//!     if !authenticated {
//!         return Err(ProtocolError::StateViolation("not authenticated"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_login(false).is_err());
//! ```

use crate::service::accounts::StoreError;
use std::io;
use thiserror::Error;

/// Static error messages shared by the handlers and the key exchange.
pub mod constants {
    /// Protocol state violations
    pub const ERR_NOT_AUTHENTICATED: &str = "client is not logged in";
    pub const ERR_ALREADY_AUTHENTICATED: &str = "client is already logged in";
    pub const ERR_LOGIN_IN_PROGRESS: &str = "a login is already being processed";
    pub const ERR_NOT_REGISTERED: &str = "game server is not registered";
    pub const ERR_ALREADY_REGISTERED: &str = "game server is already registered";

    /// Framing errors
    pub const ERR_INVALID_HEADER: &str = "frame size is smaller than its header";
    pub const ERR_EMPTY_CIPHER_KEY: &str = "stream cipher key is empty";

    /// Cryptographic errors
    pub const ERR_DECRYPTION_FAILED: &str = "decryption failed";
    pub const ERR_ENCRYPTION_FAILED: &str = "encryption failed";
    pub const ERR_INVALID_PUBLIC_KEY: &str = "public key is not a PEM encoded RSA key";
    pub const ERR_SHORT_PASSWORD: &str = "password block is shorter than the cipher needs";
}

/// Errors produced by the schema codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("field `{field}` needs {needed} bytes but only {remaining} remain")]
    UnexpectedEof {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("field `{field}` takes its length from `{reference}`, which was not decoded")]
    MissingLength {
        field: &'static str,
        reference: &'static str,
    },

    #[error("field `{field}` is variable length but declares no length")]
    UnsizedField { field: &'static str },

    #[error("field `{field}` has no length variant for version {version:#08x}")]
    NoVariant { field: &'static str, version: u32 },

    #[error("field `{field}` cannot be represented as {kind}")]
    UnsupportedRepresentation {
        field: &'static str,
        kind: &'static str,
    },

    #[error("field `{field}` expected a {expected} value")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("record `{schema}` has no field `{field}`")]
    MissingField {
        schema: &'static str,
        field: &'static str,
    },

    #[error("field `{field}` is not valid UTF-8")]
    InvalidText { field: &'static str },

    #[error("field `{field}` holds an element that decodes to zero bytes")]
    EmptyElement { field: &'static str },

    #[error("field `{field}` has overlapping length variants at version {version:#08x}")]
    OverlappingVariants { field: &'static str, version: u32 },

    #[error("field `{field}` has no length variant covering version {version:#08x}")]
    VariantGap { field: &'static str, version: u32 },
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Invalid frame header: {0}")]
    InvalidHeader(&'static str),

    #[error("Checksum mismatch: header carries {received:#04x}, expected {expected:#04x}")]
    ChecksumMismatch { expected: u8, received: u8 },

    #[error("Frame of {0} bytes exceeds the configured maximum")]
    OversizedPacket(usize),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Unparsable client version string: {0:?}")]
    InvalidVersion(String),

    #[error("Protocol state violation: {0}")]
    StateViolation(&'static str),

    #[error("Cryptographic error: {0}")]
    Crypto(&'static str),

    #[error("Account store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
