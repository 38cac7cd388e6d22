//! Pre-signature payload emission and the dual-signature protocol:
//! `BLAKE3(pod ‖ payload)` as the base hash, optional domain-separated
//! chain linkage, signatures gathered in address-table order.

use lea_crypto::hashes::blake3_parts;
use lea_tvf::Encoder;

use crate::error::WalletError;
use crate::resolver::{Instruction, ResolvedManifest};

/// Hard cap on a complete encoded transaction.
pub const MAX_TRANSACTION_LEN: usize = 1 << 20;

/// Domain tag for chained signatures: the ASCII bytes of `TX-LINK-V1`
/// followed by 22 zero bytes. Fixed forever.
pub const DOMAIN_TX_LINK_V1: [u8; 32] = *b"TX-LINK-V1\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";

/// A signed, wire-ready transaction with its identifying hashes.
pub struct BuiltTransaction {
    pub bytes: Vec<u8>,
    /// Hex of the base hash; identifies the transaction.
    pub tx_id: String,
    /// Hex of the link hash when chain linkage was applied.
    pub link_id: Option<String>,
}

/// Derives the chained signing message. A zero `prev` carries no linkage
/// and degrades to the base hash.
pub fn compute_tx_link_hash(prev: &[u8; 32], base: &[u8; 32]) -> [u8; 32] {
    if prev.iter().all(|byte| *byte == 0) {
        return *base;
    }
    blake3_parts(&[&DOMAIN_TX_LINK_V1, prev, base])
}

/// Encodes one invocation's instruction list as a nested TVF stream.
pub fn encode_instructions(instructions: &[Instruction]) -> Result<Vec<u8>, WalletError> {
    let mut enc = Encoder::new();
    for instruction in instructions {
        match instruction {
            Instruction::Uleb(value) => enc.add_uleb(*value),
            Instruction::Sleb(value) => enc.add_sleb(*value),
            Instruction::Vector(bytes) => enc.add_vector(bytes)?,
            // Raw injection: the bytes are already valid TVF (pubset
            // content in this repository).
            Instruction::Inline(bytes) => enc.add_raw(bytes),
        }
    }
    Ok(enc.build())
}

/// Emits the pre-signature payload: version, sequence, address table, gas,
/// and the invocation blocks.
pub fn pre_signature_payload(resolved: &ResolvedManifest) -> Result<Vec<u8>, WalletError> {
    let mut enc = Encoder::new();
    enc.add_uleb(resolved.version);
    enc.add_uleb(resolved.sequence);
    let mut table = Vec::with_capacity(resolved.addresses.len() * 32);
    for address in &resolved.addresses {
        table.extend_from_slice(address.as_bytes());
    }
    enc.add_vector(&table)?;
    enc.add_uleb(resolved.gas_limit);
    enc.add_uleb(resolved.gas_price);
    for invocation in &resolved.invocations {
        enc.add_uleb(invocation.target as u128);
        enc.add_vector(&encode_instructions(&invocation.instructions)?)?;
    }
    Ok(enc.build())
}

/// Signs and assembles the final wire bytes:
/// `pod ‖ payload ‖ {vector(ed_sig) ‖ vector(fal_sig)}*`.
///
/// `prev_tx_hash`, when given, links this transaction to its predecessor;
/// an all-zero hash falls back to unchained signing with a warning.
pub fn build_transaction(
    resolved: &ResolvedManifest,
    prev_tx_hash: Option<[u8; 32]>,
) -> Result<BuiltTransaction, WalletError> {
    if resolved.signers.is_empty() {
        // An unsigned resolution is a valid intermediate, but the wire
        // format requires at least one signature pair.
        return Err(WalletError::MissingFeePayer);
    }

    let payload = pre_signature_payload(resolved)?;
    let base_hash = blake3_parts(&[&resolved.pod, &payload]);

    let (message, link_id) = match prev_tx_hash {
        None => (base_hash, None),
        Some(prev) => {
            if prev.iter().all(|byte| *byte == 0) {
                tracing::warn!("previous transaction hash is all zeros; signing unchained");
                (base_hash, None)
            } else {
                let link = compute_tx_link_hash(&prev, &base_hash);
                (link, Some(hex::encode(link)))
            }
        }
    };

    let mut enc = Encoder::new();
    enc.add_raw(&payload);
    for (alias, handler) in &resolved.signers {
        let signature = handler.sign_message(&message).map_err(|err| match err {
            WalletError::InvalidKeyset(_) => {
                WalletError::InvalidKeyset(format!("signer {alias} cannot sign"))
            }
            other => other,
        })?;
        enc.add_vector(&signature.ed25519)?;
        enc.add_vector(&signature.falcon512)?;
    }

    let mut bytes = Vec::with_capacity(32 + enc.len());
    bytes.extend_from_slice(&resolved.pod);
    bytes.extend_from_slice(&enc.build());
    if bytes.len() > MAX_TRANSACTION_LEN {
        return Err(WalletError::SizeBudgetExceeded {
            size: bytes.len(),
            max: MAX_TRANSACTION_LEN,
        });
    }

    Ok(BuiltTransaction {
        bytes,
        tx_id: hex::encode(base_hash),
        link_id,
    })
}
