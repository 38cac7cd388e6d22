use std::fmt;

use bech32::{self, FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

pub const ADDRESS_HRP: &str = "lea";
pub const ADDRESS_LEN: usize = 32;

/// A raw 32-byte Lea address. External forms are lowercase hex and Bech32m
/// under the `lea` HRP; equality and ordering are byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(#[serde(with = "serde_addr32")] pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != ADDRESS_LEN {
            return Err(WalletError::BadAddress(format!(
                "expected {ADDRESS_LEN} bytes, found {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_bech32(&self) -> String {
        // Direct 8-bit to 5-bit regrouping of the raw bytes, no witness
        // version. Encoding a fixed-length payload cannot fail.
        bech32::encode(ADDRESS_HRP, self.0.to_base32(), Variant::Bech32m)
            .expect("valid hrp")
    }

    pub fn from_bech32(address: &str) -> Result<Self, WalletError> {
        let (hrp, data, variant) = bech32::decode(address)
            .map_err(|err| WalletError::BadAddress(format!("{address}: {err}")))?;
        if hrp != ADDRESS_HRP {
            return Err(WalletError::BadAddress(format!(
                "{address}: expected HRP {ADDRESS_HRP}, got {hrp}"
            )));
        }
        if variant != Variant::Bech32m {
            return Err(WalletError::BadAddress(format!(
                "{address}: not a Bech32m string"
            )));
        }
        let bytes = Vec::<u8>::from_base32(&data)
            .map_err(|err| WalletError::BadAddress(format!("{address}: {err}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self, WalletError> {
        let bytes = decode_hex(text)?;
        Self::from_bytes(&bytes)
    }

    /// Accepts either external form, dispatching on the HRP prefix.
    pub fn parse(text: &str) -> Result<Self, WalletError> {
        if text.to_ascii_lowercase().starts_with("lea1") {
            Self::from_bech32(text)
        } else {
            Self::from_hex(text)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

/// Case-insensitive hex decoding with an optional `0x` prefix.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, WalletError> {
    let stripped = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(stripped).map_err(|err| WalletError::BadAddress(format!("{text}: {err}")))
}

mod serde_addr32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom("expected 32 bytes"));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}
