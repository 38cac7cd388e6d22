//! Cryptographic primitives for the Lea transaction toolkit: BLAKE3
//! hashing and the two signature algorithms every signer carries
//! (Ed25519 and Falcon-512), behind a byte-oriented trait so backends
//! can be swapped without touching the toolkit core.

pub mod ed25519;
pub mod error;
pub mod falcon512;
pub mod hashes;
pub mod traits;

pub use ed25519::Ed25519;
pub use error::CryptoError;
pub use falcon512::Falcon512;
pub use traits::SignatureScheme;
