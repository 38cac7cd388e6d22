//! Ed25519 backend over `ed25519-dalek`.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::CryptoError;
use crate::traits::{check_len, SignatureScheme};

pub const ED25519_PUBLIC_KEY_LEN: usize = 32;
pub const ED25519_SECRET_KEY_LEN: usize = 32;
pub const ED25519_SIGNATURE_LEN: usize = 64;

pub struct Ed25519;

impl SignatureScheme for Ed25519 {
    const NAME: &'static str = "ed25519";

    fn public_key_len() -> usize {
        ED25519_PUBLIC_KEY_LEN
    }

    fn secret_key_len() -> usize {
        ED25519_SECRET_KEY_LEN
    }

    fn signature_max_len() -> usize {
        ED25519_SIGNATURE_LEN
    }

    fn generate_keypair() -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        Ok((
            signing_key.to_bytes().to_vec(),
            signing_key.verifying_key().to_bytes().to_vec(),
        ))
    }

    fn sign(secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_len(ED25519_SECRET_KEY_LEN, secret_key)?;
        let mut seed = [0u8; ED25519_SECRET_KEY_LEN];
        seed.copy_from_slice(secret_key);
        let signing_key = SigningKey::from_bytes(&seed);
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<(), CryptoError> {
        check_len(ED25519_PUBLIC_KEY_LEN, public_key)?;
        let mut pk = [0u8; ED25519_PUBLIC_KEY_LEN];
        pk.copy_from_slice(public_key);
        let verifying_key =
            VerifyingKey::from_bytes(&pk).map_err(|_| CryptoError::InvalidKey(Self::NAME))?;
        let signature = Signature::from_slice(signature)
            .map_err(|_| CryptoError::InvalidSignature(Self::NAME))?;
        verifying_key
            .verify(message, &signature)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let (sk, pk) = Ed25519::generate_keypair().unwrap();
        let message = b"lea transaction payload";
        let signature = Ed25519::sign(&sk, message).unwrap();
        assert_eq!(signature.len(), ED25519_SIGNATURE_LEN);
        assert!(Ed25519::verify(&pk, &signature, message).is_ok());
        assert_eq!(
            Ed25519::verify(&pk, &signature, b"tampered"),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [7u8; 32];
        let a = Ed25519::sign(&seed, b"msg").unwrap();
        let b = Ed25519::sign(&seed, b"msg").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_key_lengths() {
        assert_eq!(
            Ed25519::sign(&[0u8; 31], b"msg"),
            Err(CryptoError::InvalidLength {
                expected: 32,
                found: 31
            })
        );
    }
}
