//! Client version inference.
//!
//! Clients announce a build date with the version message, but many send it
//! late or not at all. Some messages imply a minimum epoch on their own, so
//! each inbound frame is inspected before it is dispatched.

use crate::core::epoch::Epoch;
use crate::error::{ProtocolError, Result};
use crate::protocol::message::ids;

/// Account frames larger than this come from 5.2+ clients.
const LEGACY_ACCOUNT_FRAME: u32 = 58;

const BUILD_DATES: &[(u32, Epoch)] = &[
    (200_609_280, Epoch::V2_0),
    (200_701_120, Epoch::V4_1),
    (201_507_080, Epoch::V9_2),
    (20_210_128, Epoch::V9_6_7),
];

/// Maps an announced build date to its epoch. Unknown dates fall back to
/// the oldest supported layout.
pub fn epoch_for_build(build: &str) -> Result<Epoch> {
    let date: u32 = build
        .parse()
        .map_err(|_| ProtocolError::InvalidVersion(build.to_string()))?;
    Ok(BUILD_DATES
        .iter()
        .find(|(known, _)| *known == date)
        .map_or(Epoch::V2_0, |(_, epoch)| *epoch))
}

/// The least epoch a frame implies by its id and size alone.
pub fn implied_epoch(message_id: u16, frame_size: u32) -> Option<Epoch> {
    match message_id {
        ids::ACCOUNT if frame_size > LEGACY_ACCOUNT_FRAME => Some(Epoch::V5_2),
        ids::RSA_PUBLIC_KEY => Some(Epoch::V9_6_3),
        ids::RSA_PUBLIC_KEY_V2 => Some(Epoch::V8_1_1),
        _ => None,
    }
}
