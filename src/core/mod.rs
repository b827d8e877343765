//! # Core Protocol Components
//!
//! Wire format building blocks: protocol epochs, the schema-driven record
//! codec, the frame header and the tokio frame codec.
//!
//! ## Components
//! - **Epoch**: protocol versions and the windows fields are valid in
//! - **Schema**: declarative record layouts encoded and decoded per epoch
//! - **Packet**: the 7-byte frame header and whole frames
//! - **Codec**: tokio codec framing a byte stream, optionally through the
//!   stream cipher
//!
//! ## Wire Format
//! ```text
//! [Size(4, LE, whole frame)] [MessageId(2, LE)] [Checksum(1)] [Body(Size - 7)]
//! ```
//!
//! The checksum is the low byte of the sum of the six bytes before it.

pub mod codec;
pub mod epoch;
pub mod packet;
pub mod schema;
