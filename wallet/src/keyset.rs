//! Signer key material: dual-algorithm keysets, address derivation, and the
//! serialized public-key-set (pubset) form embedded in transactions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use lea_crypto::hashes::blake3_parts;
use lea_crypto::{Ed25519, Falcon512, SignatureScheme};
use lea_tvf::{Decoder, Encoder};

use crate::address::Address;
use crate::error::WalletError;

/// Pubset marker for the Ed25519 public key. Reserved.
pub const PUBSET_MARKER_ED25519: u128 = 0;
/// Pubset marker for the Falcon-512 public key. Reserved.
pub const PUBSET_MARKER_FALCON512: u128 = 1;

/// On-disk keyfile: `{"keyset": [[ed_sk, ed_pk], [fal_sk, fal_pk]],
/// "address"?, "addressHex"?}` with byte arrays as JSON number arrays.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeysetFile {
    pub keyset: Vec<Vec<Vec<u8>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, rename = "addressHex", skip_serializing_if = "Option::is_none")]
    pub address_hex: Option<String>,
}

impl KeysetFile {
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let raw = fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Generates a fresh dual keyset with its derived address declared.
    pub fn generate() -> Result<Self, WalletError> {
        let (ed_sk, ed_pk) = Ed25519::generate_keypair()?;
        let (fal_sk, fal_pk) = Falcon512::generate_keypair()?;
        let address = Address(blake3_parts(&[&ed_pk, &fal_pk]));
        Ok(Self {
            keyset: vec![vec![ed_sk, ed_pk], vec![fal_sk, fal_pk]],
            address: Some(address.to_bech32()),
            address_hex: Some(address.to_hex()),
        })
    }
}

/// Both signatures a signer produces over one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualSignature {
    pub ed25519: Vec<u8>,
    pub falcon512: Vec<u8>,
}

/// Per-algorithm verification outcome; `ok` is the conjunction.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct VerifyReport {
    pub ok: bool,
    pub ed25519: bool,
    pub falcon512: bool,
}

/// A loaded signer: secret material (zeroized on drop), cached public keys,
/// and the derived address `BLAKE3(ed_pk ‖ fal_pk)`.
pub struct KeyHandler {
    ed_secret: Zeroizing<Vec<u8>>,
    ed_public: Vec<u8>,
    falcon_secret: Zeroizing<Vec<u8>>,
    falcon_public: Vec<u8>,
    address: Address,
}

impl std::fmt::Debug for KeyHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHandler")
            .field("address", &self.address)
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}

impl KeyHandler {
    pub fn from_keyset(file: &KeysetFile) -> Result<Self, WalletError> {
        if file.keyset.len() != 2 || file.keyset.iter().any(|pair| pair.len() != 2) {
            return Err(WalletError::InvalidKeyset(
                "keyset must be [[ed_sk, ed_pk], [fal_sk, fal_pk]]".into(),
            ));
        }
        let ed_secret = file.keyset[0][0].clone();
        let ed_public = file.keyset[0][1].clone();
        let falcon_secret = file.keyset[1][0].clone();
        let falcon_public = file.keyset[1][1].clone();

        check_key_len("ed25519 public key", &ed_public, Ed25519::public_key_len())?;
        check_key_len(
            "falcon512 public key",
            &falcon_public,
            Falcon512::public_key_len(),
        )?;
        match (ed_secret.is_empty(), falcon_secret.is_empty()) {
            (true, true) => {}
            (false, false) => {
                check_key_len("ed25519 secret key", &ed_secret, Ed25519::secret_key_len())?;
                check_key_len(
                    "falcon512 secret key",
                    &falcon_secret,
                    Falcon512::secret_key_len(),
                )?;
            }
            _ => {
                return Err(WalletError::InvalidKeyset(
                    "keyset must carry both secret keys or neither".into(),
                ));
            }
        }

        let handler = Self {
            address: Address(blake3_parts(&[&ed_public, &falcon_public])),
            ed_secret: Zeroizing::new(ed_secret),
            ed_public,
            falcon_secret: Zeroizing::new(falcon_secret),
            falcon_public,
        };

        if let Some(declared) = &file.address {
            let declared_addr = Address::from_bech32(declared)?;
            if declared_addr != handler.address {
                return Err(WalletError::KeyAddressMismatch {
                    declared: declared.clone(),
                    derived: handler.address.to_bech32(),
                });
            }
        }
        if let Some(declared_hex) = &file.address_hex {
            let declared_addr = Address::from_hex(declared_hex)?;
            if declared_addr != handler.address {
                return Err(WalletError::KeyAddressMismatch {
                    declared: declared_hex.clone(),
                    derived: handler.address.to_hex(),
                });
            }
        }
        Ok(handler)
    }

    /// Builds a verification-only handler from bare public keys. Secret
    /// slots stay empty so decoded material never carries private bytes.
    pub fn from_public(ed_public: Vec<u8>, falcon_public: Vec<u8>) -> Result<Self, WalletError> {
        check_key_len("ed25519 public key", &ed_public, Ed25519::public_key_len())?;
        check_key_len(
            "falcon512 public key",
            &falcon_public,
            Falcon512::public_key_len(),
        )?;
        Ok(Self {
            address: Address(blake3_parts(&[&ed_public, &falcon_public])),
            ed_secret: Zeroizing::new(Vec::new()),
            ed_public,
            falcon_secret: Zeroizing::new(Vec::new()),
            falcon_public,
        })
    }

    /// Parses the four-item pubset blob back into a public-only handler.
    pub fn from_pubset(bytes: &[u8]) -> Result<Self, WalletError> {
        let mut dec = Decoder::new(bytes);
        let ed_marker = dec.read_uleb()?;
        if ed_marker != PUBSET_MARKER_ED25519 {
            return Err(WalletError::InvalidKeyset(format!(
                "pubset ed25519 marker must be {PUBSET_MARKER_ED25519}, found {ed_marker}"
            )));
        }
        let ed_public = dec.read_vector()?;
        let fal_marker = dec.read_uleb()?;
        if fal_marker != PUBSET_MARKER_FALCON512 {
            return Err(WalletError::InvalidKeyset(format!(
                "pubset falcon512 marker must be {PUBSET_MARKER_FALCON512}, found {fal_marker}"
            )));
        }
        let falcon_public = dec.read_vector()?;
        if dec.has_next() {
            return Err(WalletError::InvalidKeyset(
                "pubset carries trailing items".into(),
            ));
        }
        Self::from_public(ed_public, falcon_public)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn ed_public(&self) -> &[u8] {
        &self.ed_public
    }

    pub fn falcon_public(&self) -> &[u8] {
        &self.falcon_public
    }

    /// Whether this handler holds secret keys and can sign.
    pub fn can_sign(&self) -> bool {
        !self.ed_secret.is_empty()
    }

    /// Signs the raw message bytes with both algorithms. The caller passes
    /// the already-computed hash; no digest is applied here.
    pub fn sign_message(&self, message: &[u8]) -> Result<DualSignature, WalletError> {
        if !self.can_sign() {
            return Err(WalletError::InvalidKeyset(
                "keyset is public-only and cannot sign".into(),
            ));
        }
        Ok(DualSignature {
            ed25519: Ed25519::sign(&self.ed_secret, message)?,
            falcon512: Falcon512::sign(&self.falcon_secret, message)?,
        })
    }

    pub fn verify(&self, message: &[u8], signature: &DualSignature) -> VerifyReport {
        let ed25519 = Ed25519::verify(&self.ed_public, &signature.ed25519, message).is_ok();
        let falcon512 =
            Falcon512::verify(&self.falcon_public, &signature.falcon512, message).is_ok();
        VerifyReport {
            ok: ed25519 && falcon512,
            ed25519,
            falcon512,
        }
    }

    /// Serialized public-key-set: `uvarint(0) ‖ vector(ed_pk) ‖ uvarint(1) ‖
    /// vector(fal_pk)`.
    pub fn pubset(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.add_uleb(PUBSET_MARKER_ED25519);
        enc.add_vector(&self.ed_public)
            .expect("public key fits a vector");
        enc.add_uleb(PUBSET_MARKER_FALCON512);
        enc.add_vector(&self.falcon_public)
            .expect("public key fits a vector");
        enc.build()
    }
}

fn check_key_len(what: &str, bytes: &[u8], expected: usize) -> Result<(), WalletError> {
    if bytes.len() != expected {
        return Err(WalletError::InvalidKeyset(format!(
            "{what} must be {expected} bytes, found {}",
            bytes.len()
        )));
    }
    Ok(())
}
