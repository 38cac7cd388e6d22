use crate::error::TvfError;
use crate::varint::{decode_sleb, decode_uleb};
use crate::{HEADER_LARGE_VECTOR, HEADER_SLEB, HEADER_ULEB, MAX_VECTOR_LEN};

/// The three primitive kinds a TVF item can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Sleb,
    Uleb,
    Vector,
}

/// Cursor decoder over a borrowed TVF buffer. Typed reads fail
/// `HeaderMismatch` when the next item's tag disagrees, and payload slices
/// are copied out so the caller may discard the input buffer.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Byte offset of the cursor within the underlying buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unconsumed tail of the buffer.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn peek_kind(&self) -> Result<ItemKind, TvfError> {
        let header = self.peek_header()?;
        Ok(match header & 0b11 {
            0b00 => ItemKind::Sleb,
            0b01 => ItemKind::Uleb,
            _ => ItemKind::Vector,
        })
    }

    pub fn read_uleb(&mut self) -> Result<u128, TvfError> {
        let header = self.peek_header()?;
        if header != HEADER_ULEB {
            return Err(TvfError::HeaderMismatch {
                offset: self.pos,
                expected: "unsigned varint",
                found: header,
            });
        }
        let start = self.pos + 1;
        let (value, consumed) =
            decode_uleb(&self.buf[start..]).map_err(|err| err.at(start))?;
        self.pos = start + consumed;
        Ok(value)
    }

    pub fn read_sleb(&mut self) -> Result<i128, TvfError> {
        let header = self.peek_header()?;
        if header != HEADER_SLEB {
            return Err(TvfError::HeaderMismatch {
                offset: self.pos,
                expected: "signed varint",
                found: header,
            });
        }
        let start = self.pos + 1;
        let (value, consumed) =
            decode_sleb(&self.buf[start..]).map_err(|err| err.at(start))?;
        self.pos = start + consumed;
        Ok(value)
    }

    pub fn read_vector(&mut self) -> Result<Vec<u8>, TvfError> {
        let header = self.peek_header()?;
        let (len, payload_start) = match header & 0b11 {
            0b10 => ((header >> 2) as usize, self.pos + 1),
            0b11 => {
                // The large-vector header carries no length bits of its own.
                if header != HEADER_LARGE_VECTOR {
                    return Err(TvfError::HeaderMismatch {
                        offset: self.pos,
                        expected: "vector",
                        found: header,
                    });
                }
                let start = self.pos + 1;
                let (len, consumed) =
                    decode_uleb(&self.buf[start..]).map_err(|err| err.at(start))?;
                if len > MAX_VECTOR_LEN as u128 {
                    return Err(TvfError::SizeExceeded {
                        what: "vector length",
                        len,
                        max: MAX_VECTOR_LEN as u128,
                    });
                }
                (len as usize, start + consumed)
            }
            _ => {
                return Err(TvfError::HeaderMismatch {
                    offset: self.pos,
                    expected: "vector",
                    found: header,
                });
            }
        };
        let end = payload_start + len;
        if end > self.buf.len() {
            return Err(TvfError::Truncated {
                offset: self.buf.len(),
            });
        }
        let payload = self.buf[payload_start..end].to_vec();
        self.pos = end;
        Ok(payload)
    }

    fn peek_header(&self) -> Result<u8, TvfError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(TvfError::Truncated { offset: self.pos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    #[test]
    fn typed_reads_follow_stream_order() {
        let mut enc = Encoder::new();
        enc.add_uleb(7);
        enc.add_sleb(-3);
        enc.add_vector(b"abc").unwrap();
        let bytes = enc.build();

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.peek_kind().unwrap(), ItemKind::Uleb);
        assert_eq!(dec.read_uleb().unwrap(), 7);
        assert_eq!(dec.peek_kind().unwrap(), ItemKind::Sleb);
        assert_eq!(dec.read_sleb().unwrap(), -3);
        assert_eq!(dec.peek_kind().unwrap(), ItemKind::Vector);
        assert_eq!(dec.read_vector().unwrap(), b"abc");
        assert!(!dec.has_next());
    }

    #[test]
    fn header_mismatch_is_reported_with_offset() {
        let mut enc = Encoder::new();
        enc.add_uleb(1);
        enc.add_sleb(2);
        let bytes = enc.build();
        let mut dec = Decoder::new(&bytes);
        dec.read_uleb().unwrap();
        assert_eq!(
            dec.read_uleb(),
            Err(TvfError::HeaderMismatch {
                offset: 2,
                expected: "unsigned varint",
                found: 0x00,
            })
        );
    }

    #[test]
    fn declared_length_is_checked_before_allocation() {
        // Large-vector header declaring 2^20 + 1 bytes with no payload.
        let mut bytes = vec![HEADER_LARGE_VECTOR];
        bytes.extend_from_slice(&crate::varint::encode_uleb((MAX_VECTOR_LEN + 1) as u128));
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(
            dec.read_vector(),
            Err(TvfError::SizeExceeded { .. })
        ));
    }

    #[test]
    fn truncated_vector_payload() {
        let bytes = vec![(4 << 2) | 0b10, 0x01];
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_vector(), Err(TvfError::Truncated { offset: 2 }));
    }

    #[test]
    fn nonzero_high_bits_in_large_header_are_rejected() {
        let bytes = vec![0x07, 0x00];
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(
            dec.read_vector(),
            Err(TvfError::HeaderMismatch { .. })
        ));
    }
}
