use crate::error::TvfError;
use crate::varint::{encode_sleb, encode_uleb};
use crate::{HEADER_LARGE_VECTOR, HEADER_SLEB, HEADER_ULEB, MAX_VECTOR_LEN, SMALL_VECTOR_MAX, TAG_SMALL_VECTOR};

/// Append-only TVF stream builder. Each `add_*` call pushes one chunk;
/// `build` concatenates them into the final buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    chunks: Vec<Vec<u8>>,
    len: usize,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total byte length of the stream built so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn add_uleb(&mut self, value: u128) {
        let mut chunk = vec![HEADER_ULEB];
        chunk.extend_from_slice(&encode_uleb(value));
        self.push(chunk);
    }

    pub fn add_sleb(&mut self, value: i128) {
        let mut chunk = vec![HEADER_SLEB];
        chunk.extend_from_slice(&encode_sleb(value));
        self.push(chunk);
    }

    pub fn add_vector(&mut self, payload: &[u8]) -> Result<(), TvfError> {
        if payload.len() > MAX_VECTOR_LEN {
            return Err(TvfError::SizeExceeded {
                what: "vector length",
                len: payload.len() as u128,
                max: MAX_VECTOR_LEN as u128,
            });
        }
        let mut chunk;
        if payload.len() <= SMALL_VECTOR_MAX {
            chunk = Vec::with_capacity(1 + payload.len());
            chunk.push(((payload.len() as u8) << 2) | TAG_SMALL_VECTOR);
        } else {
            let len_prefix = encode_uleb(payload.len() as u128);
            chunk = Vec::with_capacity(1 + len_prefix.len() + payload.len());
            chunk.push(HEADER_LARGE_VECTOR);
            chunk.extend_from_slice(&len_prefix);
        }
        chunk.extend_from_slice(payload);
        self.push(chunk);
        Ok(())
    }

    /// Injects `bytes` verbatim, with no framing header. The caller is
    /// responsible for the bytes themselves being valid TVF.
    pub fn add_raw(&mut self, bytes: &[u8]) {
        self.push(bytes.to_vec());
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in self.chunks {
            out.extend_from_slice(&chunk);
        }
        out
    }

    fn push(&mut self, chunk: Vec<u8>) {
        self.len += chunk.len();
        self.chunks.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_vector_packs_length_into_header() {
        let mut enc = Encoder::new();
        enc.add_vector(&[0xaa, 0xbb]).unwrap();
        assert_eq!(enc.build(), vec![(2 << 2) | 0b10, 0xaa, 0xbb]);
    }

    #[test]
    fn large_vector_carries_uleb_length() {
        let payload = vec![0x55u8; 64];
        let mut enc = Encoder::new();
        enc.add_vector(&payload).unwrap();
        let built = enc.build();
        assert_eq!(built[0], HEADER_LARGE_VECTOR);
        assert_eq!(built[1], 64);
        assert_eq!(&built[2..], payload.as_slice());
    }

    #[test]
    fn oversized_vector_is_rejected() {
        let mut enc = Encoder::new();
        let err = enc.add_vector(&vec![0u8; MAX_VECTOR_LEN + 1]).unwrap_err();
        assert!(matches!(err, TvfError::SizeExceeded { .. }));
    }

    #[test]
    fn raw_chunks_skip_framing() {
        let mut enc = Encoder::new();
        enc.add_uleb(1);
        enc.add_raw(&[0x01, 0x02]);
        assert_eq!(enc.build(), vec![0x01, 0x01, 0x01, 0x02]);
    }
}
