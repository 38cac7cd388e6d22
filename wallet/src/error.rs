use thiserror::Error;

use lea_crypto::CryptoError;
use lea_tvf::TvfError;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid address: {0}")]
    BadAddress(String),

    #[error("unknown constant: {0}")]
    UnknownConstant(String),

    #[error("unknown signer: {0}")]
    UnknownSigner(String),

    #[error("address reference resolved outside the address table: {0}")]
    UnresolvedAddress(String),

    #[error("signed manifest does not define a feePayer")]
    MissingFeePayer,

    #[error("feePayer {0} is not among the signers")]
    UnknownFeePayer(String),

    #[error("keyset address mismatch: declared {declared}, derived {derived}")]
    KeyAddressMismatch { declared: String, derived: String },

    #[error("invalid keyset: {0}")]
    InvalidKeyset(String),

    #[error("unsupported instruction kind: {0}")]
    UnsupportedInstruction(String),

    #[error("instruction carries more than one operational key: {0}")]
    AmbiguousInstruction(String),

    #[error("INLINE value must be raw bytes, found {0}")]
    InlineTypeMismatch(&'static str),

    #[error("invocation {invocation} targets index {index}, address table holds {count}")]
    IndexOutOfRange {
        invocation: usize,
        index: usize,
        count: usize,
    },

    #[error("signature section must hold one or more (ed25519, falcon512) pairs, found {0} vectors")]
    UnpairedSignature(usize),

    #[error("invalid VM header: {0}")]
    VmHeaderInvalid(String),

    #[error("transaction size {size} exceeds the {max} byte budget")]
    SizeBudgetExceeded { size: usize, max: usize },

    #[error("unsupported transaction version {0}")]
    UnsupportedVersion(u128),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error(transparent)]
    Tvf(#[from] TvfError),

    #[error("cryptography failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
