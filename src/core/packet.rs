//! # Frames
//!
//! Every message on the wire is one frame: a 7-byte header followed by the
//! message body.
//!
//! ```text
//! +------------+---------------+------------+------------------+
//! | size (u32) | message (u16) | check (u8) | body (size - 7)  |
//! +------------+---------------+------------+------------------+
//! ```
//!
//! `size` counts the whole frame, header included. `check` is the low byte
//! of the sum of the six bytes before it.

use crate::core::epoch::Epoch;
use crate::core::schema::{Field, Record, Scalar, Schema};
use crate::error::{constants, CodecError, ProtocolError, Result};
use bytes::Bytes;

pub const HEADER_LEN: usize = 7;

/// The header as a schema, embedded first in every message schema.
pub static HEADER: Schema = Schema::new(
    "FrameHeader",
    &[
        Field::scalar("size", Scalar::U32),
        Field::scalar("message_id", Scalar::U16),
        Field::scalar("checksum", Scalar::U8),
    ],
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub size: u32,
    pub message_id: u16,
    pub checksum: u8,
}

/// Low byte of the sum of the size and id bytes.
pub fn checksum(size: u32, message_id: u16) -> u8 {
    size.to_le_bytes()
        .iter()
        .chain(message_id.to_le_bytes().iter())
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

impl FrameHeader {
    pub fn new(size: u32, message_id: u16) -> Self {
        Self {
            size,
            message_id,
            checksum: checksum(size, message_id),
        }
    }

    pub fn parse(raw: &[u8; HEADER_LEN]) -> Self {
        Self {
            size: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            message_id: u16::from_le_bytes([raw[4], raw[5]]),
            checksum: raw[6],
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut raw = [0u8; HEADER_LEN];
        raw[..4].copy_from_slice(&self.size.to_le_bytes());
        raw[4..6].copy_from_slice(&self.message_id.to_le_bytes());
        raw[6] = self.checksum;
        raw
    }

    pub fn is_valid(&self) -> bool {
        self.checksum == checksum(self.size, self.message_id)
    }

    /// Fails with [`ProtocolError::ChecksumMismatch`] for a corrupt header.
    pub fn validate(&self) -> Result<()> {
        if !self.is_valid() {
            return Err(ProtocolError::ChecksumMismatch {
                expected: checksum(self.size, self.message_id),
                received: self.checksum,
            });
        }
        if (self.size as usize) < HEADER_LEN {
            return Err(ProtocolError::InvalidHeader(constants::ERR_INVALID_HEADER));
        }
        Ok(())
    }

    pub fn from_record(record: &Record) -> std::result::Result<Self, CodecError> {
        Ok(Self {
            size: record.u32("size")?,
            message_id: record.u16("message_id")?,
            checksum: record.u8("checksum")?,
        })
    }

    pub fn to_record(&self) -> Record {
        Record::new(&HEADER)
            .with("size", self.size)
            .with("message_id", self.message_id)
            .with("checksum", self.checksum)
    }
}

/// One decrypted frame, header bytes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    bytes: Bytes,
}

impl Frame {
    /// Wraps bytes that were read off the wire and already validated.
    pub fn from_wire(header: FrameHeader, bytes: Bytes) -> Self {
        Self { header, bytes }
    }

    /// Takes an encoded message whose first seven bytes are a placeholder
    /// header and patches in the real size, id and checksum.
    pub fn seal(message_id: u16, mut encoded: Vec<u8>) -> Result<Self> {
        if encoded.len() < HEADER_LEN {
            return Err(ProtocolError::InvalidHeader(constants::ERR_INVALID_HEADER));
        }
        let size = u32::try_from(encoded.len())
            .map_err(|_| ProtocolError::OversizedPacket(encoded.len()))?;
        let header = FrameHeader::new(size, message_id);
        encoded[..HEADER_LEN].copy_from_slice(&header.to_bytes());
        Ok(Self {
            header,
            bytes: Bytes::from(encoded),
        })
    }

    pub fn header(&self) -> FrameHeader {
        self.header
    }

    pub fn message_id(&self) -> u16 {
        self.header.message_id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Everything after the header.
    pub fn body(&self) -> &[u8] {
        self.bytes.get(HEADER_LEN..).unwrap_or_default()
    }

    /// Re-reads the leading header through the codec.
    pub fn decode_header(&self, epoch: Epoch) -> std::result::Result<FrameHeader, CodecError> {
        FrameHeader::from_record(&HEADER.decode(&self.bytes, epoch)?)
    }
}
