//! Schema-driven decoder for execution-result streams: repeating
//! `vector(program_id) ‖ uvarint(count) ‖ {uvarint(key) ‖ value}*` groups
//! projected through the manifest's `resultSchema`.

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use lea_tvf::{Decoder, ItemKind};

use crate::address::Address;
use crate::error::WalletError;
use crate::manifest::Manifest;
use crate::resolver::resolve_address_ref;
use crate::value::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultValue {
    Uleb(u128),
    Sleb(i128),
    Vector(Vec<u8>),
}

impl ResultValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Uleb(_) => "uleb",
            Self::Sleb(_) => "sleb",
            Self::Vector(_) => "vector",
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Uleb(value) => match u64::try_from(*value) {
                Ok(small) => json!(small),
                Err(_) => json!(value.to_string()),
            },
            Self::Sleb(value) => match i64::try_from(*value) {
                Ok(small) => json!(small),
                Err(_) => json!(value.to_string()),
            },
            Self::Vector(bytes) => json!(hex::encode(bytes)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldKind {
    Uleb,
    Sleb,
    Vector,
}

struct FieldSpec {
    name: String,
    kind: FieldKind,
}

/// Per-program field specs keyed by canonical address, parsed from
/// `resultSchema` entries of the form `"fieldName": "type(key)"`.
fn schema_of(
    manifest: &Manifest,
) -> Result<BTreeMap<Address, BTreeMap<u128, FieldSpec>>, WalletError> {
    let mut out = BTreeMap::new();
    let Some(schema) = manifest
        .root()
        .as_object()
        .and_then(|root| root.get("resultSchema"))
    else {
        return Ok(out);
    };
    let programs = schema.as_object().ok_or_else(|| {
        WalletError::InvalidManifest("resultSchema must be an object".into())
    })?;
    for (program_ref, fields) in programs {
        let address = resolve_address_ref(manifest, program_ref)?;
        let fields = fields.as_object().ok_or_else(|| {
            WalletError::InvalidManifest(format!(
                "resultSchema entry {program_ref} must be an object"
            ))
        })?;
        let mut by_key = BTreeMap::new();
        for (field_name, spec) in fields {
            let Value::Text(spec) = spec else {
                return Err(WalletError::InvalidManifest(format!(
                    "schema field {field_name} must be a string like \"uleb(0)\""
                )));
            };
            let (kind, key) = parse_field_spec(spec).ok_or_else(|| {
                WalletError::InvalidManifest(format!(
                    "schema field {field_name} has malformed spec {spec:?}"
                ))
            })?;
            by_key.insert(
                key,
                FieldSpec {
                    name: field_name.clone(),
                    kind,
                },
            );
        }
        out.insert(address, by_key);
    }
    Ok(out)
}

fn parse_field_spec(spec: &str) -> Option<(FieldKind, u128)> {
    let (kind, rest) = spec.split_once('(')?;
    let key = rest.strip_suffix(')')?;
    let kind = match kind {
        "uleb" => FieldKind::Uleb,
        "sleb" => FieldKind::Sleb,
        "vector" => FieldKind::Vector,
        _ => return None,
    };
    Some((kind, key.parse().ok()?))
}

/// Decodes a result buffer and projects it through the manifest's schema.
/// Returns program-address-hex → field name → value. Type mismatches
/// between schema and stream warn and keep the decoded value; unknown keys
/// surface as `key_<N>`.
pub fn decode_results(
    bytes: &[u8],
    manifest: &Manifest,
) -> Result<BTreeMap<String, BTreeMap<String, ResultValue>>, WalletError> {
    let schema = schema_of(manifest)?;
    let mut out: BTreeMap<String, BTreeMap<String, ResultValue>> = BTreeMap::new();

    let mut dec = Decoder::new(bytes);
    while dec.has_next() {
        let program_id = dec.read_vector()?;
        let program = Address::from_bytes(&program_id)?;
        let fields = schema.get(&program);
        let entry_count = dec.read_uleb()?;
        let program_out = out.entry(program.to_hex()).or_default();
        for _ in 0..entry_count {
            let key = dec.read_uleb()?;
            let value = match dec.peek_kind()? {
                ItemKind::Uleb => ResultValue::Uleb(dec.read_uleb()?),
                ItemKind::Sleb => ResultValue::Sleb(dec.read_sleb()?),
                ItemKind::Vector => ResultValue::Vector(dec.read_vector()?),
            };
            let name = match fields.and_then(|fields| fields.get(&key)) {
                Some(spec) => {
                    let expected = match spec.kind {
                        FieldKind::Uleb => "uleb",
                        FieldKind::Sleb => "sleb",
                        FieldKind::Vector => "vector",
                    };
                    if expected != value.kind_name() {
                        tracing::warn!(
                            program = %program.to_hex(),
                            field = %spec.name,
                            expected,
                            found = value.kind_name(),
                            "result schema type mismatch"
                        );
                    }
                    spec.name.clone()
                }
                None => format!("key_{key}"),
            };
            program_out.insert(name, value);
        }
    }
    Ok(out)
}

/// JSON presentation of a decoded result map.
pub fn results_to_json(results: &BTreeMap<String, BTreeMap<String, ResultValue>>) -> JsonValue {
    let mut out = serde_json::Map::new();
    for (program, fields) in results {
        let mut program_out = serde_json::Map::new();
        for (name, value) in fields {
            program_out.insert(name.clone(), value.to_json());
        }
        out.insert(program.clone(), JsonValue::Object(program_out));
    }
    JsonValue::Object(out)
}
