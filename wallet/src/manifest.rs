//! The authoring manifest: a JSON document held as a [`Value`] tree so the
//! resolver passes can substitute directives anywhere a string literal is
//! allowed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::WalletError;
use crate::value::Value;

/// Default 32-byte routing pod when the manifest omits one.
pub const DEFAULT_POD: [u8; 32] = [0x11; 32];

/// The four instruction kinds the wire format admits. Historical numeric
/// widths (`uint8`, `uint64`, ...) are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionKind {
    Uleb,
    Sleb,
    Vector,
    Inline,
}

#[derive(Clone, Debug)]
pub struct Manifest {
    root: Value,
}

impl Manifest {
    pub fn from_value(root: Value) -> Result<Self, WalletError> {
        if root.as_object().is_none() {
            return Err(WalletError::InvalidManifest(
                "manifest root must be an object".into(),
            ));
        }
        Ok(Self { root })
    }

    pub fn from_json_str(text: &str) -> Result<Self, WalletError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(Value::from_json(&json)?)
    }

    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Aliases listed under `signers`, if any.
    pub fn signer_aliases(&self) -> Result<Vec<String>, WalletError> {
        let Some(entry) = self.top_level("signers") else {
            return Ok(Vec::new());
        };
        let items = entry.as_array().ok_or_else(|| {
            WalletError::InvalidManifest("signers must be an array of aliases".into())
        })?;
        items
            .iter()
            .map(|item| {
                item.as_text().map(str::to_owned).ok_or_else(|| {
                    WalletError::InvalidManifest("signers entries must be strings".into())
                })
            })
            .collect()
    }

    pub fn fee_payer(&self) -> Option<&str> {
        self.top_level("feePayer").and_then(Value::as_text)
    }

    /// Strips every `$keyset(path)` directive from the tree, returning the
    /// (alias, path) pairs it found. The directive is a pre-processing
    /// convenience, not part of the manifest language, so it must be gone
    /// before resolution.
    pub fn take_keyset_directives(&mut self) -> Vec<(String, String)> {
        let mut found = Vec::new();
        strip_keysets(&mut self.root, &mut found);
        found
    }

    /// Binds `name` as a constant, creating the `constants` object when the
    /// manifest has none. Used by the CLI to expose file contents through
    /// `$const(name)`.
    pub fn insert_constant(&mut self, name: &str, value: Value) {
        if let Value::Object(entries) = &mut self.root {
            let constants = entries
                .entry("constants".to_string())
                .or_insert_with(|| Value::Object(BTreeMap::new()));
            if let Value::Object(map) = constants {
                map.insert(name.to_string(), value);
            }
        }
    }

    /// Per-invocation instruction kinds, used by the transaction decoder to
    /// label decoded items (INLINE content versus plain vectors).
    pub fn instruction_layout(&self) -> Result<Vec<Vec<InstructionKind>>, WalletError> {
        let Some(entry) = self.top_level("invocations") else {
            return Ok(Vec::new());
        };
        let invocations = entry.as_array().ok_or_else(|| {
            WalletError::InvalidManifest("invocations must be an array".into())
        })?;
        let mut layout = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            let object = invocation.as_object().ok_or_else(|| {
                WalletError::InvalidManifest("invocations entries must be objects".into())
            })?;
            let mut kinds = Vec::new();
            if let Some(instructions) = object.get("instructions") {
                let items = instructions.as_array().ok_or_else(|| {
                    WalletError::InvalidManifest("instructions must be an array".into())
                })?;
                for item in items {
                    let entries = item.as_object().ok_or_else(|| {
                        WalletError::InvalidManifest("instructions entries must be objects".into())
                    })?;
                    let (kind, _) = instruction_entry(entries)?;
                    kinds.push(kind);
                }
            }
            layout.push(kinds);
        }
        Ok(layout)
    }

    fn top_level(&self, key: &str) -> Option<&Value> {
        self.root.as_object().and_then(|entries| entries.get(key))
    }
}

/// Splits an instruction object into its single operational key and value,
/// ignoring `comment`.
pub(crate) fn instruction_entry(
    entries: &BTreeMap<String, Value>,
) -> Result<(InstructionKind, &Value), WalletError> {
    let mut found: Option<(InstructionKind, &Value)> = None;
    for (key, value) in entries {
        if key == "comment" {
            continue;
        }
        let kind = match key.as_str() {
            "uleb" => InstructionKind::Uleb,
            "sleb" => InstructionKind::Sleb,
            "vector" => InstructionKind::Vector,
            "INLINE" => InstructionKind::Inline,
            other => return Err(WalletError::UnsupportedInstruction(other.to_string())),
        };
        if found.is_some() {
            let keys: Vec<&str> = entries
                .keys()
                .filter(|k| *k != "comment")
                .map(String::as_str)
                .collect();
            return Err(WalletError::AmbiguousInstruction(keys.join(", ")));
        }
        found = Some((kind, value));
    }
    found.ok_or_else(|| WalletError::UnsupportedInstruction("(empty instruction)".into()))
}

/// Whole-string directive match: `$name(arg)` with a non-empty argument.
pub(crate) fn directive_arg<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix("$")?.strip_prefix(name)?;
    let arg = rest.strip_prefix('(')?.strip_suffix(')')?;
    if arg.is_empty() {
        return None;
    }
    Some(arg)
}

fn strip_keysets(value: &mut Value, found: &mut Vec<(String, String)>) {
    match value {
        Value::Object(entries) => {
            let keys: Vec<String> = entries.keys().cloned().collect();
            for key in keys {
                let path = entries.get(&key).and_then(Value::as_text).and_then(|text| {
                    directive_arg(text, "keyset").map(str::to_owned)
                });
                if let Some(path) = path {
                    entries.remove(&key);
                    found.push((key, path));
                } else if let Some(child) = entries.get_mut(&key) {
                    strip_keysets(child, found);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_keysets(item, found);
            }
        }
        _ => {}
    }
}
