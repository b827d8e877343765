use crate::core::packet::{Frame, FrameHeader, HEADER_LEN};
use crate::error::{ProtocolError, Result};
use crate::utils::rc4::StreamCipher;
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

/// Largest frame accepted when no limit is configured.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Frame codec for one direction of a connection.
///
/// Decoding peeks at the first seven buffered bytes, previews them through
/// the cipher and validates the header before anything is consumed. Only
/// once the whole frame is buffered is it split off and decrypted for real,
/// header included. Encoding writes sealed frames through the cipher.
#[derive(Debug)]
pub struct FrameCodec {
    cipher: Option<StreamCipher>,
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn plain() -> Self {
        Self {
            cipher: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn encrypted(key: &str) -> Result<Self> {
        Ok(Self {
            cipher: Some(StreamCipher::new(key)?),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        })
    }

    /// Plain or encrypted depending on whether a key is given.
    pub fn for_key(key: Option<&str>) -> Result<Self> {
        match key {
            Some(key) => Self::encrypted(key),
            None => Ok(Self::plain()),
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size.max(HEADER_LEN);
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut peek = [0u8; HEADER_LEN];
        peek.copy_from_slice(&src[..HEADER_LEN]);
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.preview(&mut peek);
        }
        let header = FrameHeader::parse(&peek);
        header.validate()?;

        let size = header.size as usize;
        if size > self.max_frame_size {
            return Err(ProtocolError::OversizedPacket(size));
        }
        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }

        let mut bytes = src.split_to(size);
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.apply(&mut bytes);
        }
        Ok(Some(Frame::from_wire(header, bytes.freeze())))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        dst.extend_from_slice(frame.as_bytes());
        if let Some(cipher) = self.cipher.as_mut() {
            cipher.apply(&mut dst[start..]);
        }
        Ok(())
    }
}
