use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid length: expected {expected} bytes, found {found}")]
    InvalidLength { expected: usize, found: usize },

    #[error("invalid {0} key")]
    InvalidKey(&'static str),

    #[error("invalid {0} signature")]
    InvalidSignature(&'static str),

    #[error("verification failed")]
    VerificationFailed,
}
