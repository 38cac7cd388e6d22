//! Symmetric decoder for the transaction wire format, with optional
//! manifest-assisted labeling of INLINE instruction content and hash
//! helpers for external re-verification.

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use lea_crypto::hashes::blake3_parts;
use lea_tvf::{Decoder, Encoder, ItemKind, TvfError};

use crate::address::Address;
use crate::error::WalletError;
use crate::keyset::{
    DualSignature, KeyHandler, VerifyReport, PUBSET_MARKER_ED25519, PUBSET_MARKER_FALCON512,
};
use crate::manifest::{InstructionKind, Manifest};
use crate::resolver::TX_VERSION;
use crate::tx_builder::MAX_TRANSACTION_LEN;

pub const VM_MAGIC: [u8; 4] = *b"LEAB";
pub const VM_VERSION: u8 = 0x01;
pub const VM_HEADER_LEN: usize = 4 + 1 + 8;

/// Metadata of the optional `LEAB` wrapper some runtimes prepend.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct VmHeader {
    pub version: u8,
    pub length: u64,
}

/// Validates and strips the VM wrapper, returning its metadata and the
/// wrapped transaction bytes.
pub fn strip_vm_header(bytes: &[u8]) -> Result<(VmHeader, &[u8]), WalletError> {
    if bytes.len() < VM_HEADER_LEN {
        return Err(WalletError::VmHeaderInvalid(format!(
            "{} bytes is too short for a VM header",
            bytes.len()
        )));
    }
    if bytes[..4] != VM_MAGIC {
        return Err(WalletError::VmHeaderInvalid("bad magic".into()));
    }
    if bytes[4] != VM_VERSION {
        return Err(WalletError::VmHeaderInvalid(format!(
            "unsupported VM header version {:#04x}",
            bytes[4]
        )));
    }
    let mut length_bytes = [0u8; 8];
    length_bytes.copy_from_slice(&bytes[5..VM_HEADER_LEN]);
    let length = u64::from_le_bytes(length_bytes);
    let rest = &bytes[VM_HEADER_LEN..];
    if length != rest.len() as u64 {
        return Err(WalletError::VmHeaderInvalid(format!(
            "declared length {length} but {} bytes follow",
            rest.len()
        )));
    }
    Ok((VmHeader { version: bytes[4], length }, rest))
}

/// Prepends the VM wrapper to finished transaction bytes.
pub fn wrap_vm_header(tx: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(VM_HEADER_LEN + tx.len());
    out.extend_from_slice(&VM_MAGIC);
    out.push(VM_VERSION);
    out.extend_from_slice(&(tx.len() as u64).to_le_bytes());
    out.extend_from_slice(tx);
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedInstruction {
    Uleb(u128),
    Sleb(i128),
    Vector(Vec<u8>),
    /// An INLINE slot holding an embedded pubset. Secret keys are
    /// zero-length stubs; private material never round-trips.
    Keyset {
        ed25519_public: Vec<u8>,
        falcon512_public: Vec<u8>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInvocation {
    pub target: usize,
    pub instructions: Vec<DecodedInstruction>,
}

pub struct DecodedTransaction {
    pub vm_header: Option<VmHeader>,
    pub pod: [u8; 32],
    pub version: u128,
    pub sequence: u128,
    pub gas_limit: u128,
    pub gas_price: u128,
    pub addresses: Vec<Address>,
    pub invocations: Vec<DecodedInvocation>,
    pub signatures: Vec<DualSignature>,
    pre_signature: Vec<u8>,
    signature_section: Vec<u8>,
}

/// Decodes raw transaction bytes. With `strip_vm` the `LEAB` wrapper is
/// validated and removed first; without it wrapped input fails. A manifest,
/// when supplied, labels each decoded instruction from its authoring form.
pub fn decode_transaction(
    bytes: &[u8],
    manifest: Option<&Manifest>,
    strip_vm: bool,
) -> Result<DecodedTransaction, WalletError> {
    let (vm_header, bytes) = if strip_vm {
        let (header, rest) = strip_vm_header(bytes)?;
        (Some(header), rest)
    } else {
        (None, bytes)
    };

    if bytes.len() > MAX_TRANSACTION_LEN {
        return Err(WalletError::SizeBudgetExceeded {
            size: bytes.len(),
            max: MAX_TRANSACTION_LEN,
        });
    }
    if bytes.len() < 32 {
        return Err(WalletError::Tvf(TvfError::Truncated {
            offset: bytes.len(),
        }));
    }
    let mut pod = [0u8; 32];
    pod.copy_from_slice(&bytes[..32]);
    let body = &bytes[32..];

    let mut dec = Decoder::new(body);
    let version = dec.read_uleb()?;
    if version != TX_VERSION {
        return Err(WalletError::UnsupportedVersion(version));
    }
    let sequence = dec.read_uleb()?;

    let table = dec.read_vector()?;
    if table.len() % 32 != 0 {
        return Err(WalletError::BadAddress(format!(
            "address table of {} bytes is not a multiple of 32",
            table.len()
        )));
    }
    let addresses: Vec<Address> = table
        .chunks_exact(32)
        .map(|chunk| Address::from_bytes(chunk).expect("32-byte chunk"))
        .collect();

    let gas_limit = dec.read_uleb()?;
    let gas_price = dec.read_uleb()?;

    let layout = manifest.map(Manifest::instruction_layout).transpose()?;

    let mut raw_invocations: Vec<(usize, Vec<u8>)> = Vec::new();
    while dec.has_next() && dec.peek_kind()? == ItemKind::Uleb {
        let target = dec.read_uleb()? as usize;
        if target >= addresses.len() {
            return Err(WalletError::IndexOutOfRange {
                invocation: raw_invocations.len(),
                index: target,
                count: addresses.len(),
            });
        }
        let instructions = dec.read_vector()?;
        raw_invocations.push((target, instructions));
    }

    let pre_signature = body[..dec.position()].to_vec();
    let signature_section = body[dec.position()..].to_vec();

    let mut signature_vectors: Vec<Vec<u8>> = Vec::new();
    while dec.has_next() {
        signature_vectors.push(dec.read_vector()?);
    }
    if signature_vectors.is_empty() || signature_vectors.len() % 2 != 0 {
        return Err(WalletError::UnpairedSignature(signature_vectors.len()));
    }
    let signatures: Vec<DualSignature> = signature_vectors
        .chunks_exact(2)
        .map(|pair| DualSignature {
            ed25519: pair[0].clone(),
            falcon512: pair[1].clone(),
        })
        .collect();

    let mut invocations = Vec::with_capacity(raw_invocations.len());
    for (position, (target, raw)) in raw_invocations.into_iter().enumerate() {
        let kinds = layout
            .as_ref()
            .and_then(|layout| layout.get(position))
            .map(Vec::as_slice);
        invocations.push(DecodedInvocation {
            target,
            instructions: decode_instruction_stream(&raw, kinds)?,
        });
    }

    Ok(DecodedTransaction {
        vm_header,
        pod,
        version,
        sequence,
        gas_limit,
        gas_price,
        addresses,
        invocations,
        signatures,
        pre_signature,
        signature_section,
    })
}

fn decode_instruction_stream(
    bytes: &[u8],
    kinds: Option<&[InstructionKind]>,
) -> Result<Vec<DecodedInstruction>, WalletError> {
    let mut dec = Decoder::new(bytes);
    let mut out = Vec::new();
    if let Some(kinds) = kinds {
        for kind in kinds {
            if !dec.has_next() {
                break;
            }
            out.push(match kind {
                InstructionKind::Uleb => DecodedInstruction::Uleb(dec.read_uleb()?),
                InstructionKind::Sleb => DecodedInstruction::Sleb(dec.read_sleb()?),
                InstructionKind::Vector => DecodedInstruction::Vector(dec.read_vector()?),
                InstructionKind::Inline => decode_inline_pubset(&mut dec)?,
            });
        }
    }
    // Anything past the labeled prefix (or the whole stream without a
    // manifest) decodes generically.
    while dec.has_next() {
        out.push(match dec.peek_kind()? {
            ItemKind::Uleb => DecodedInstruction::Uleb(dec.read_uleb()?),
            ItemKind::Sleb => DecodedInstruction::Sleb(dec.read_sleb()?),
            ItemKind::Vector => DecodedInstruction::Vector(dec.read_vector()?),
        });
    }
    Ok(out)
}

fn decode_inline_pubset(dec: &mut Decoder<'_>) -> Result<DecodedInstruction, WalletError> {
    let ed_marker = dec.read_uleb()?;
    if ed_marker != PUBSET_MARKER_ED25519 {
        return Err(WalletError::InvalidKeyset(format!(
            "embedded pubset ed25519 marker must be {PUBSET_MARKER_ED25519}, found {ed_marker}"
        )));
    }
    let ed25519_public = dec.read_vector()?;
    let fal_marker = dec.read_uleb()?;
    if fal_marker != PUBSET_MARKER_FALCON512 {
        return Err(WalletError::InvalidKeyset(format!(
            "embedded pubset falcon512 marker must be {PUBSET_MARKER_FALCON512}, found {fal_marker}"
        )));
    }
    let falcon512_public = dec.read_vector()?;
    Ok(DecodedInstruction::Keyset {
        ed25519_public,
        falcon512_public,
    })
}

impl DecodedTransaction {
    /// Raw pre-signature payload bytes (everything between the pod and the
    /// signature section).
    pub fn pre_signature(&self) -> &[u8] {
        &self.pre_signature
    }

    /// Raw signature-section bytes.
    pub fn signature_section(&self) -> &[u8] {
        &self.signature_section
    }

    /// Recomputes `BLAKE3(pod ‖ pre_signature_bytes)`.
    pub fn base_hash(&self) -> [u8; 32] {
        blake3_parts(&[&self.pod, &self.pre_signature])
    }

    /// Re-encodes the decoded structure. Canonical varint and vector forms
    /// make this byte-identical to the original input.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WalletError> {
        let mut enc = Encoder::new();
        enc.add_uleb(self.version);
        enc.add_uleb(self.sequence);
        let mut table = Vec::with_capacity(self.addresses.len() * 32);
        for address in &self.addresses {
            table.extend_from_slice(address.as_bytes());
        }
        enc.add_vector(&table)?;
        enc.add_uleb(self.gas_limit);
        enc.add_uleb(self.gas_price);
        for invocation in &self.invocations {
            enc.add_uleb(invocation.target as u128);
            let mut inner = Encoder::new();
            for instruction in &invocation.instructions {
                match instruction {
                    DecodedInstruction::Uleb(value) => inner.add_uleb(*value),
                    DecodedInstruction::Sleb(value) => inner.add_sleb(*value),
                    DecodedInstruction::Vector(bytes) => inner.add_vector(bytes)?,
                    DecodedInstruction::Keyset {
                        ed25519_public,
                        falcon512_public,
                    } => {
                        inner.add_uleb(PUBSET_MARKER_ED25519);
                        inner.add_vector(ed25519_public)?;
                        inner.add_uleb(PUBSET_MARKER_FALCON512);
                        inner.add_vector(falcon512_public)?;
                    }
                }
            }
            enc.add_vector(&inner.build())?;
        }
        for signature in &self.signatures {
            enc.add_vector(&signature.ed25519)?;
            enc.add_vector(&signature.falcon512)?;
        }
        let mut out = Vec::with_capacity(32 + enc.len());
        out.extend_from_slice(&self.pod);
        out.extend_from_slice(&enc.build());
        Ok(out)
    }

    /// First embedded pubset, as a verification-only key handler.
    pub fn embedded_keyset(&self) -> Option<Result<KeyHandler, WalletError>> {
        self.invocations
            .iter()
            .flat_map(|invocation| invocation.instructions.iter())
            .find_map(|instruction| match instruction {
                DecodedInstruction::Keyset {
                    ed25519_public,
                    falcon512_public,
                } => Some(KeyHandler::from_public(
                    ed25519_public.clone(),
                    falcon512_public.clone(),
                )),
                _ => None,
            })
    }

    /// Presentation form with hex/bech32m decorations for CLI output.
    pub fn to_json(&self) -> JsonValue {
        let addresses: Vec<JsonValue> = self
            .addresses
            .iter()
            .map(|address| {
                json!({
                    "hex": address.to_hex(),
                    "bech32m": address.to_bech32(),
                })
            })
            .collect();
        let invocations: Vec<JsonValue> = self
            .invocations
            .iter()
            .map(|invocation| {
                let instructions: Vec<JsonValue> = invocation
                    .instructions
                    .iter()
                    .map(instruction_json)
                    .collect();
                json!({
                    "targetIndex": invocation.target,
                    "instructions": instructions,
                })
            })
            .collect();
        let signatures: Vec<JsonValue> = self
            .signatures
            .iter()
            .map(|signature| {
                json!({
                    "ed25519": hex::encode(&signature.ed25519),
                    "falcon512": hex::encode(&signature.falcon512),
                })
            })
            .collect();
        let mut out = json!({
            "pod": hex::encode(self.pod),
            "version": uint_json(self.version),
            "sequence": uint_json(self.sequence),
            "gasLimit": uint_json(self.gas_limit),
            "gasPrice": uint_json(self.gas_price),
            "addresses": addresses,
            "invocations": invocations,
            "signatures": signatures,
            "txId": hex::encode(self.base_hash()),
        });
        if let Some(header) = &self.vm_header {
            out["vmHeader"] = json!({
                "version": header.version,
                "length": header.length,
            });
        }
        out
    }
}

/// Verifies a decoded single-signer transaction against a public keyset:
/// recomputes the base hash and checks both signatures.
pub fn verify_single_signer(
    decoded: &DecodedTransaction,
    handler: &KeyHandler,
) -> Result<VerifyReport, WalletError> {
    if decoded.signatures.len() != 1 {
        return Err(WalletError::InvalidManifest(format!(
            "verification requires exactly one signer, found {}",
            decoded.signatures.len()
        )));
    }
    Ok(handler.verify(&decoded.base_hash(), &decoded.signatures[0]))
}

fn instruction_json(instruction: &DecodedInstruction) -> JsonValue {
    match instruction {
        DecodedInstruction::Uleb(value) => json!({ "uleb": uint_json(*value) }),
        DecodedInstruction::Sleb(value) => json!({ "sleb": int_json(*value) }),
        DecodedInstruction::Vector(bytes) => json!({ "vector": hex::encode(bytes) }),
        DecodedInstruction::Keyset {
            ed25519_public,
            falcon512_public,
        } => json!({
            "keyset": {
                "ed25519": { "secretKey": "", "publicKey": hex::encode(ed25519_public) },
                "falcon512": { "secretKey": "", "publicKey": hex::encode(falcon512_public) },
            }
        }),
    }
}

fn uint_json(value: u128) -> JsonValue {
    match u64::try_from(value) {
        Ok(small) => json!(small),
        Err(_) => json!(value.to_string()),
    }
}

fn int_json(value: i128) -> JsonValue {
    match i64::try_from(value) {
        Ok(small) => json!(small),
        Err(_) => json!(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_header_round_trip() {
        let tx = vec![0x11u8; 40];
        let wrapped = wrap_vm_header(&tx);
        let (header, rest) = strip_vm_header(&wrapped).unwrap();
        assert_eq!(header.version, VM_VERSION);
        assert_eq!(header.length, 40);
        assert_eq!(rest, tx.as_slice());
    }

    #[test]
    fn vm_header_rejects_bad_magic_and_length() {
        let tx = vec![0x11u8; 40];
        let mut wrapped = wrap_vm_header(&tx);
        wrapped[0] = b'X';
        assert!(matches!(
            strip_vm_header(&wrapped),
            Err(WalletError::VmHeaderInvalid(_))
        ));

        let mut wrapped = wrap_vm_header(&tx);
        wrapped.pop();
        assert!(matches!(
            strip_vm_header(&wrapped),
            Err(WalletError::VmHeaderInvalid(_))
        ));
    }
}
