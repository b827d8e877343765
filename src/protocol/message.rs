//! # Messages
//!
//! Message ids and the [`WireMessage`] trait binding a typed message to its
//! schema.
//!
//! Every message schema starts with the frame header as a nested record, so
//! an encoded message is a full frame with a placeholder header that
//! [`Frame::seal`](crate::core::packet::Frame::seal) patches.

use crate::core::epoch::Epoch;
use crate::core::schema::{Record, Schema};
use crate::error::CodecError;

/// Message ids.
pub mod ids {
    // client -> auth
    pub const VERSION: u16 = 50;
    pub const RSA_PUBLIC_KEY: u16 = 71;
    pub const RSA_PUBLIC_KEY_V2: u16 = 1071;
    pub const PING: u16 = 9999;
    pub const ACCOUNT: u16 = 10010;
    pub const SERVER_LIST_REQUEST: u16 = 10021;
    pub const SELECT_SERVER: u16 = 10023;

    // auth -> client
    pub const AES_KEY: u16 = 72;
    pub const AES_KEY_V2: u16 = 1072;
    pub const RESULT: u16 = 10000;
    pub const RESULT_WITH_STRING: u16 = 10002;
    pub const SERVER_LIST: u16 = 10022;
    pub const SELECT_SERVER_RESULT: u16 = 10024;

    // game -> auth
    pub const GAME_LOGIN: u16 = 20001;
    pub const CLIENT_LOGIN: u16 = 20010;
    pub const CLIENT_LOGOUT: u16 = 20012;
    pub const CLIENT_KICK_FAILED: u16 = 20014;
    pub const SECURITY_NO_CHECK: u16 = 40001;

    // auth -> game
    pub const GAME_LOGIN_RESULT: u16 = 20002;
    pub const CLIENT_LOGIN_RESULT: u16 = 20011;
    pub const KICK_CLIENT: u16 = 20013;
}

/// A typed message with a fixed schema.
pub trait WireMessage: Sized {
    fn schema() -> &'static Schema;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self, CodecError>;

    /// Decodes a whole frame, header included.
    fn decode(frame: &[u8], epoch: Epoch) -> Result<Self, CodecError> {
        Self::from_record(&Self::schema().decode(frame, epoch)?)
    }

    /// Encodes to a frame whose header still has to be sealed.
    fn encode(&self, epoch: Epoch) -> Result<Vec<u8>, CodecError> {
        self.to_record().encode(epoch)
    }
}

/// The text before the first NUL of a fixed-width field.
pub fn c_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// `text` as a NUL padded field of `width` bytes, truncated to leave room
/// for the terminator.
pub fn fixed_text(text: &str, width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width];
    let used = text.len().min(width.saturating_sub(1));
    out[..used].copy_from_slice(&text.as_bytes()[..used]);
    out
}
