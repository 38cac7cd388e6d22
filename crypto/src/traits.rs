use crate::error::CryptoError;

/// A detached-signature algorithm operating on raw byte slices.
///
/// Keys and signatures travel as plain bytes because they are read from
/// keyfiles and embedded in wire payloads; each implementation validates
/// lengths before touching its backend.
pub trait SignatureScheme {
    const NAME: &'static str;

    fn public_key_len() -> usize;
    fn secret_key_len() -> usize;
    /// Upper bound on signature length. Falcon signatures are
    /// variable-length; Ed25519 always hits the bound exactly.
    fn signature_max_len() -> usize;

    fn generate_keypair() -> Result<(Vec<u8>, Vec<u8>), CryptoError>;
    fn sign(secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>;
    fn verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<(), CryptoError>;
}

pub(crate) fn check_len(
    expected: usize,
    bytes: &[u8],
) -> Result<(), CryptoError> {
    if bytes.len() != expected {
        return Err(CryptoError::InvalidLength {
            expected,
            found: bytes.len(),
        });
    }
    Ok(())
}
