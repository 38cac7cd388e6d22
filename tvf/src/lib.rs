//! Length-prefixed tagged-value framing (TVF) used by the Lea transaction
//! wire format.
//!
//! Three primitive kinds are distinguished by the low two bits of a header
//! byte: signed varint (`0b00`), unsigned varint (`0b01`), and vectors
//! (`0b10` for payloads up to 63 bytes with the length packed into the
//! header, `0b11` for longer payloads with a ULEB128 length prefix).
//! Varints are SLEB128/ULEB128 at 128-bit width, and every decode rejects
//! non-canonical (overlong) encodings.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod varint;

pub use decoder::{Decoder, ItemKind};
pub use encoder::Encoder;
pub use error::TvfError;

/// Header byte for a signed varint item.
pub const HEADER_SLEB: u8 = 0x00;
/// Header byte for an unsigned varint item.
pub const HEADER_ULEB: u8 = 0x01;
/// Header byte for a length-prefixed vector item.
pub const HEADER_LARGE_VECTOR: u8 = 0x03;
/// Type tag carried by small-vector headers in their low two bits.
pub const TAG_SMALL_VECTOR: u8 = 0b10;

/// Largest payload that fits the small-vector header form.
pub const SMALL_VECTOR_MAX: usize = 63;
/// Hard cap on any single vector payload.
pub const MAX_VECTOR_LEN: usize = 1 << 20;
