//! Five-pass lowering of the authoring manifest into its canonical resolved
//! form: constants, pubsets, alias mapping, literal address collection,
//! canonical ordering and index substitution.
//!
//! Ordering decides which signer occupies each address-table slot, which
//! fixes signing order, byte layout, and ultimately the transaction hash;
//! every pass here is deterministic over its inputs.

use std::collections::{BTreeMap, BTreeSet};

use crate::address::{decode_hex, Address};
use crate::error::WalletError;
use crate::keyset::KeyHandler;
use crate::manifest::{directive_arg, instruction_entry, InstructionKind, Manifest, DEFAULT_POD};
use crate::value::Value;

/// Wire-format version emitted and accepted by this toolkit.
pub const TX_VERSION: u128 = 1;

/// A fully lowered instruction, ready for the wire encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Uleb(u128),
    Sleb(i128),
    Vector(Vec<u8>),
    /// Raw TVF bytes injected without framing; carries pubset content in
    /// this repository.
    Inline(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedInvocation {
    pub target: usize,
    pub instructions: Vec<Instruction>,
}

/// Canonical machine-ready form of a manifest. For signed manifests the
/// address table starts with the fee payer, then the remaining signers in
/// lexicographic byte order, then non-signer addresses likewise sorted.
#[derive(Debug)]
pub struct ResolvedManifest {
    pub pod: [u8; 32],
    pub version: u128,
    pub sequence: u128,
    pub gas_limit: u128,
    pub gas_price: u128,
    pub addresses: Vec<Address>,
    pub invocations: Vec<ResolvedInvocation>,
    /// Signers in address-table order; slot 0 is the fee payer.
    pub signers: Vec<(String, KeyHandler)>,
    /// `Some(0)` iff the manifest is signed.
    pub fee_payer: Option<usize>,
    /// Canonical address to table index, for downstream schema resolution.
    pub address_index: BTreeMap<Address, usize>,
}

pub fn resolve(
    manifest: &Manifest,
    signers: BTreeMap<String, KeyHandler>,
) -> Result<ResolvedManifest, WalletError> {
    for alias in manifest.signer_aliases()? {
        if !signers.contains_key(&alias) {
            return Err(WalletError::UnknownSigner(alias));
        }
    }

    let constants = constants_of(manifest)?;

    // Pass 1: constants. The signers subtree is copied untouched so signer
    // key objects are never traversed.
    let root = match manifest.root() {
        Value::Object(entries) => {
            let mut out = BTreeMap::new();
            for (key, value) in entries {
                if key == "signers" {
                    out.insert(key.clone(), value.clone());
                } else {
                    out.insert(key.clone(), substitute_constants(value, &constants, &mut Vec::new())?);
                }
            }
            Value::Object(out)
        }
        _ => unreachable!("manifest root is an object"),
    };

    // Pass 2: pubsets. Only an INLINE instruction may carry one.
    let root = substitute_pubsets(&root, &signers, false)?;

    // Pass 3: alias map. Signer aliases are authoritative over constants.
    // Constants that fail to resolve are skipped here; if the manifest
    // actually uses one, the substitution passes report it.
    let mut aliases: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &constants {
        if let Ok(Value::Text(text)) = substitute_constants(value, &constants, &mut Vec::new()) {
            aliases.insert(name.clone(), text);
        }
    }
    for (alias, handler) in &signers {
        aliases.insert(alias.clone(), handler.address().to_bech32());
    }

    // Pass 4: literal address collection.
    let mut literals: BTreeSet<String> = BTreeSet::new();
    collect_addr_literals(&root, &aliases, &mut literals);
    for target in invocation_targets(&root)? {
        literals.insert(resolve_addr_ref(&target, &aliases));
    }

    // Pass 5: canonical ordering.
    let mut literal_addresses: BTreeMap<String, Address> = BTreeMap::new();
    for literal in &literals {
        literal_addresses.insert(literal.clone(), Address::parse(literal)?);
    }

    let signer_addresses: BTreeSet<Address> =
        signers.values().map(KeyHandler::address).collect();
    if signer_addresses.len() != signers.len() {
        return Err(WalletError::InvalidManifest(
            "two signer aliases share one address".into(),
        ));
    }

    let (table, ordered_signers, fee_payer) = if signers.is_empty() {
        let table: Vec<Address> = literal_addresses.values().copied().collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        (table, Vec::new(), None)
    } else {
        let fee_alias = manifest
            .fee_payer()
            .ok_or(WalletError::MissingFeePayer)?
            .to_string();
        if !signers.contains_key(&fee_alias) {
            return Err(WalletError::UnknownFeePayer(fee_alias));
        }
        let mut signers = signers;
        let fee_handler = signers.remove(&fee_alias).expect("checked above");

        let mut others: Vec<(String, KeyHandler)> = signers.into_iter().collect();
        others.sort_by_key(|(_, handler)| handler.address());

        let mut ordered = Vec::with_capacity(1 + others.len());
        ordered.push((fee_alias, fee_handler));
        ordered.extend(others);

        let mut table: Vec<Address> =
            ordered.iter().map(|(_, handler)| handler.address()).collect();
        let non_signers: BTreeSet<Address> = literal_addresses
            .values()
            .filter(|address| !signer_addresses.contains(address))
            .copied()
            .collect();
        table.extend(non_signers);
        (table, ordered, Some(0))
    };

    let mut address_index: BTreeMap<Address, usize> = BTreeMap::new();
    for (index, address) in table.iter().enumerate() {
        address_index.insert(*address, index);
    }

    // Index substitution: every $addr(ref) becomes its table index.
    let root = substitute_indices(&root, &aliases, &address_index)?;

    project(root, table, ordered_signers, fee_payer, &aliases, address_index)
}

/// Resolves a single address reference (constant alias, signer alias, or
/// literal) to its canonical address, without needing signer keys. Used by
/// the execution-result decoder to key its schema.
pub fn resolve_address_ref(manifest: &Manifest, reference: &str) -> Result<Address, WalletError> {
    let constants = constants_of(manifest)?;
    let reference = match directive_arg(reference, "const") {
        Some(name) => {
            let value = constants
                .get(name)
                .ok_or_else(|| WalletError::UnknownConstant(name.to_string()))?;
            let resolved = substitute_constants(value, &constants, &mut Vec::new())?;
            match resolved {
                Value::Text(text) => text,
                other => {
                    return Err(WalletError::InvalidManifest(format!(
                        "constant {name} must name an address, found {}",
                        other.kind_name()
                    )))
                }
            }
        }
        None => reference.to_string(),
    };
    let reference = match directive_arg(&reference, "addr") {
        Some(inner) => inner.to_string(),
        None => reference,
    };
    let mut aliases = BTreeMap::new();
    for (name, value) in &constants {
        if let Value::Text(text) = value {
            aliases.insert(name.clone(), text.clone());
        }
    }
    Address::parse(&resolve_addr_ref(&reference, &aliases))
}

fn constants_of(manifest: &Manifest) -> Result<BTreeMap<String, Value>, WalletError> {
    match manifest.root().as_object().and_then(|root| root.get("constants")) {
        None => Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => Ok(entries.clone()),
        Some(other) => Err(WalletError::InvalidManifest(format!(
            "constants must be an object, found {}",
            other.kind_name()
        ))),
    }
}

fn substitute_constants(
    value: &Value,
    constants: &BTreeMap<String, Value>,
    stack: &mut Vec<String>,
) -> Result<Value, WalletError> {
    match value {
        Value::Text(text) => match directive_arg(text, "const") {
            Some(name) => {
                if stack.iter().any(|seen| seen == name) {
                    return Err(WalletError::InvalidManifest(format!(
                        "circular constant reference: {name}"
                    )));
                }
                let replacement = constants
                    .get(name)
                    .ok_or_else(|| WalletError::UnknownConstant(name.to_string()))?;
                stack.push(name.to_string());
                let resolved = substitute_constants(replacement, constants, stack)?;
                stack.pop();
                Ok(resolved)
            }
            None => Ok(value.clone()),
        },
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| substitute_constants(item, constants, stack))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(entries) => {
            let mut out = BTreeMap::new();
            for (key, child) in entries {
                out.insert(key.clone(), substitute_constants(child, constants, stack)?);
            }
            Ok(Value::Object(out))
        }
        leaf => Ok(leaf.clone()),
    }
}

/// `inline` is true only for the direct value of an `INLINE` key; a
/// `$pubset` reference anywhere else is rejected rather than expanded.
fn substitute_pubsets(
    value: &Value,
    signers: &BTreeMap<String, KeyHandler>,
    inline: bool,
) -> Result<Value, WalletError> {
    match value {
        Value::Text(text) => match directive_arg(text, "pubset") {
            Some(name) => {
                if !inline {
                    return Err(WalletError::InvalidManifest(format!(
                        "$pubset({name}) is only valid under an INLINE instruction"
                    )));
                }
                let handler = signers
                    .get(name)
                    .ok_or_else(|| WalletError::UnknownSigner(name.to_string()))?;
                Ok(Value::Bytes(handler.pubset()))
            }
            None => Ok(value.clone()),
        },
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| substitute_pubsets(item, signers, false))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(entries) => {
            let mut out = BTreeMap::new();
            for (key, child) in entries {
                out.insert(
                    key.clone(),
                    substitute_pubsets(child, signers, key == "INLINE")?,
                );
            }
            Ok(Value::Object(out))
        }
        leaf => Ok(leaf.clone()),
    }
}

/// Resolves an `$addr` inner reference through the alias map, falling back
/// to the literal itself when the reference is not a known alias.
fn resolve_addr_ref(reference: &str, aliases: &BTreeMap<String, String>) -> String {
    aliases
        .get(reference)
        .cloned()
        .unwrap_or_else(|| reference.to_string())
}

fn collect_addr_literals(
    value: &Value,
    aliases: &BTreeMap<String, String>,
    out: &mut BTreeSet<String>,
) {
    match value {
        Value::Text(text) => {
            if let Some(reference) = directive_arg(text, "addr") {
                out.insert(resolve_addr_ref(reference, aliases));
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_addr_literals(item, aliases, out);
            }
        }
        Value::Object(entries) => {
            for child in entries.values() {
                collect_addr_literals(child, aliases, out);
            }
        }
        _ => {}
    }
}

/// `targetAddress` strings that are not `$addr(...)` directives; they are
/// address references in their own right and join the collected set.
fn invocation_targets(root: &Value) -> Result<Vec<String>, WalletError> {
    let mut out = Vec::new();
    let Some(invocations) = root.as_object().and_then(|r| r.get("invocations")) else {
        return Ok(out);
    };
    let invocations = invocations
        .as_array()
        .ok_or_else(|| WalletError::InvalidManifest("invocations must be an array".into()))?;
    for invocation in invocations {
        let target = invocation
            .as_object()
            .and_then(|entries| entries.get("targetAddress"))
            .ok_or_else(|| {
                WalletError::InvalidManifest("invocation is missing targetAddress".into())
            })?;
        let text = target.as_text().ok_or_else(|| {
            WalletError::InvalidManifest("targetAddress must be a string".into())
        })?;
        if directive_arg(text, "addr").is_none() {
            out.push(text.to_string());
        }
    }
    Ok(out)
}

fn substitute_indices(
    value: &Value,
    aliases: &BTreeMap<String, String>,
    address_index: &BTreeMap<Address, usize>,
) -> Result<Value, WalletError> {
    match value {
        Value::Text(text) => match directive_arg(text, "addr") {
            Some(reference) => {
                let literal = resolve_addr_ref(reference, aliases);
                let index = index_of(&literal, address_index)?;
                Ok(Value::Integer(index as i128))
            }
            None => Ok(value.clone()),
        },
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| substitute_indices(item, aliases, address_index))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(entries) => {
            let mut out = BTreeMap::new();
            for (key, child) in entries {
                out.insert(key.clone(), substitute_indices(child, aliases, address_index)?);
            }
            Ok(Value::Object(out))
        }
        leaf => Ok(leaf.clone()),
    }
}

fn index_of(
    literal: &str,
    address_index: &BTreeMap<Address, usize>,
) -> Result<usize, WalletError> {
    let address = Address::parse(literal)?;
    address_index
        .get(&address)
        .copied()
        .ok_or_else(|| WalletError::UnresolvedAddress(literal.to_string()))
}

fn project(
    root: Value,
    addresses: Vec<Address>,
    signers: Vec<(String, KeyHandler)>,
    fee_payer: Option<usize>,
    aliases: &BTreeMap<String, String>,
    address_index: BTreeMap<Address, usize>,
) -> Result<ResolvedManifest, WalletError> {
    let entries = root.as_object().expect("root stays an object");

    let pod = match entries.get("pod") {
        None => DEFAULT_POD,
        Some(value) => {
            let text = value.as_text().ok_or_else(|| {
                WalletError::InvalidManifest("pod must be a hex string".into())
            })?;
            let bytes = decode_hex(text)?;
            if bytes.len() != 32 {
                return Err(WalletError::BadAddress(format!(
                    "pod must be 32 bytes, found {}",
                    bytes.len()
                )));
            }
            let mut pod = [0u8; 32];
            pod.copy_from_slice(&bytes);
            pod
        }
    };

    let required_uint = |key: &str| -> Result<u128, WalletError> {
        entries
            .get(key)
            .ok_or_else(|| WalletError::InvalidManifest(format!("manifest is missing {key}")))?
            .expect_uint(key)
    };
    let sequence = required_uint("sequence")?;
    let gas_limit = required_uint("gasLimit")?;
    let gas_price = required_uint("gasPrice")?;

    let mut invocations = Vec::new();
    if let Some(value) = entries.get("invocations") {
        let items = value
            .as_array()
            .ok_or_else(|| WalletError::InvalidManifest("invocations must be an array".into()))?;
        for (position, item) in items.iter().enumerate() {
            let invocation = item.as_object().ok_or_else(|| {
                WalletError::InvalidManifest("invocations entries must be objects".into())
            })?;
            let target_value = invocation.get("targetAddress").ok_or_else(|| {
                WalletError::InvalidManifest("invocation is missing targetAddress".into())
            })?;
            let target = match target_value {
                // $addr(...) targets were already rewritten to indices;
                // bare literals and aliases resolve here.
                Value::Text(text) => {
                    index_of(&resolve_addr_ref(text, aliases), &address_index)?
                }
                other => other.expect_uint("targetAddress")? as usize,
            };
            if target >= addresses.len() {
                return Err(WalletError::IndexOutOfRange {
                    invocation: position,
                    index: target,
                    count: addresses.len(),
                });
            }
            let mut instructions = Vec::new();
            if let Some(list) = invocation.get("instructions") {
                let list = list.as_array().ok_or_else(|| {
                    WalletError::InvalidManifest("instructions must be an array".into())
                })?;
                for entry in list {
                    let object = entry.as_object().ok_or_else(|| {
                        WalletError::InvalidManifest(
                            "instructions entries must be objects".into(),
                        )
                    })?;
                    instructions.push(lower_instruction(object)?);
                }
            }
            invocations.push(ResolvedInvocation {
                target,
                instructions,
            });
        }
    }

    Ok(ResolvedManifest {
        pod,
        version: TX_VERSION,
        sequence,
        gas_limit,
        gas_price,
        addresses,
        invocations,
        signers,
        fee_payer,
        address_index,
    })
}

fn lower_instruction(
    entries: &BTreeMap<String, Value>,
) -> Result<Instruction, WalletError> {
    let (kind, value) = instruction_entry(entries)?;
    match kind {
        InstructionKind::Uleb => Ok(Instruction::Uleb(value.expect_uint("uleb operand")?)),
        InstructionKind::Sleb => Ok(Instruction::Sleb(value.expect_int("sleb operand")?)),
        InstructionKind::Vector => Ok(Instruction::Vector(vector_operand(value)?)),
        InstructionKind::Inline => match value {
            Value::Bytes(bytes) => Ok(Instruction::Inline(bytes.clone())),
            other => Err(WalletError::InlineTypeMismatch(other.kind_name())),
        },
    }
}

fn vector_operand(value: &Value) -> Result<Vec<u8>, WalletError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes.clone()),
        Value::Text(text) => decode_hex(text).map_err(|_| {
            WalletError::InvalidManifest(format!("vector operand {text:?} is not valid hex"))
        }),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let byte = item.expect_uint("vector byte")?;
                u8::try_from(byte).map_err(|_| {
                    WalletError::InvalidManifest(format!("vector byte {byte} out of range"))
                })
            })
            .collect(),
        other => Err(WalletError::InvalidManifest(format!(
            "vector operand must be bytes, hex text, or a byte array, found {}",
            other.kind_name()
        ))),
    }
}
