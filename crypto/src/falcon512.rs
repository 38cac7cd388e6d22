//! Falcon-512 backend over the PQClean bindings in `pqcrypto-falcon`.
//!
//! Falcon signatures are variable-length; `signature_max_len` reports the
//! scheme's upper bound and callers must frame signatures explicitly.

use pqcrypto_falcon::falcon512;
use pqcrypto_traits::sign::{DetachedSignature, PublicKey, SecretKey};

use crate::error::CryptoError;
use crate::traits::{check_len, SignatureScheme};

pub struct Falcon512;

impl SignatureScheme for Falcon512 {
    const NAME: &'static str = "falcon512";

    fn public_key_len() -> usize {
        falcon512::public_key_bytes()
    }

    fn secret_key_len() -> usize {
        falcon512::secret_key_bytes()
    }

    fn signature_max_len() -> usize {
        falcon512::signature_bytes()
    }

    fn generate_keypair() -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let (pk, sk) = falcon512::keypair();
        Ok((sk.as_bytes().to_vec(), pk.as_bytes().to_vec()))
    }

    fn sign(secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        check_len(falcon512::secret_key_bytes(), secret_key)?;
        let sk = falcon512::SecretKey::from_bytes(secret_key)
            .map_err(|_| CryptoError::InvalidKey(Self::NAME))?;
        let signature = falcon512::detached_sign(message, &sk);
        Ok(signature.as_bytes().to_vec())
    }

    fn verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<(), CryptoError> {
        check_len(falcon512::public_key_bytes(), public_key)?;
        let pk = falcon512::PublicKey::from_bytes(public_key)
            .map_err(|_| CryptoError::InvalidKey(Self::NAME))?;
        let signature = falcon512::DetachedSignature::from_bytes(signature)
            .map_err(|_| CryptoError::InvalidSignature(Self::NAME))?;
        falcon512::verify_detached_signature(&signature, message, &pk)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let (sk, pk) = Falcon512::generate_keypair().unwrap();
        assert_eq!(sk.len(), Falcon512::secret_key_len());
        assert_eq!(pk.len(), Falcon512::public_key_len());

        let message = b"lea transaction payload";
        let signature = Falcon512::sign(&sk, message).unwrap();
        assert!(signature.len() <= Falcon512::signature_max_len());
        assert!(Falcon512::verify(&pk, &signature, message).is_ok());
        assert_eq!(
            Falcon512::verify(&pk, &signature, b"tampered"),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn cross_key_verification_fails() {
        let (sk, _) = Falcon512::generate_keypair().unwrap();
        let (_, other_pk) = Falcon512::generate_keypair().unwrap();
        let signature = Falcon512::sign(&sk, b"msg").unwrap();
        assert!(Falcon512::verify(&other_pk, &signature, b"msg").is_err());
    }
}
