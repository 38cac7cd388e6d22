use blake3::Hasher as Blake3Hasher;

pub fn blake3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake3Hasher::new();
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// BLAKE3 over the concatenation of `parts`, without materializing the
/// concatenated buffer.
pub fn blake3_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake3Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_match_concatenation() {
        let mut joined = Vec::new();
        joined.extend_from_slice(b"lea");
        joined.extend_from_slice(b"-");
        joined.extend_from_slice(b"toolkit");
        assert_eq!(
            blake3_parts(&[b"lea", b"-", b"toolkit"]),
            blake3_256(&joined)
        );
    }

    #[test]
    fn empty_input_vector() {
        // BLAKE3 of the empty string, from the reference test vectors.
        assert_eq!(
            hex::encode(blake3_256(b"")),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }
}
