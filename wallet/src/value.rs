//! The heterogeneous tree the resolver passes operate on. Byte arrays are
//! leaves, never objects, so substitution walks stay cheap.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::WalletError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bytes(Vec<u8>),
    Integer(i128),
    Text(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn from_json(json: &JsonValue) -> Result<Self, WalletError> {
        match json {
            JsonValue::String(text) => Ok(Self::Text(text.clone())),
            JsonValue::Number(num) => {
                if let Some(value) = num.as_i64() {
                    Ok(Self::Integer(value as i128))
                } else if let Some(value) = num.as_u64() {
                    Ok(Self::Integer(value as i128))
                } else {
                    // Values past 2^53 must be written as decimal strings.
                    Err(WalletError::InvalidManifest(format!(
                        "non-integer number {num} in manifest; quote large values as strings"
                    )))
                }
            }
            JsonValue::Array(items) => Ok(Self::Array(
                items.iter().map(Self::from_json).collect::<Result<_, _>>()?,
            )),
            JsonValue::Object(entries) => {
                let mut out = BTreeMap::new();
                for (key, value) in entries {
                    out.insert(key.clone(), Self::from_json(value)?);
                }
                Ok(Self::Object(out))
            }
            JsonValue::Bool(_) | JsonValue::Null => Err(WalletError::InvalidManifest(format!(
                "unsupported JSON value {json} in manifest"
            ))),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Non-negative integer, accepting decimal `Text` for values past the
    /// range JSON numbers can carry.
    pub fn expect_uint(&self, what: &str) -> Result<u128, WalletError> {
        match self {
            Self::Integer(value) if *value >= 0 => Ok(*value as u128),
            Self::Text(text) => text.parse::<u128>().map_err(|_| {
                WalletError::InvalidManifest(format!(
                    "{what} must be a non-negative integer, found {text:?}"
                ))
            }),
            other => Err(WalletError::InvalidManifest(format!(
                "{what} must be a non-negative integer, found {}",
                other.kind_name()
            ))),
        }
    }

    /// Signed integer, accepting decimal `Text`.
    pub fn expect_int(&self, what: &str) -> Result<i128, WalletError> {
        match self {
            Self::Integer(value) => Ok(*value),
            Self::Text(text) => text.parse::<i128>().map_err(|_| {
                WalletError::InvalidManifest(format!(
                    "{what} must be an integer, found {text:?}"
                ))
            }),
            other => Err(WalletError::InvalidManifest(format!(
                "{what} must be an integer, found {}",
                other.kind_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_conversion_preserves_structure() {
        let json: JsonValue =
            serde_json::from_str(r#"{"a": [1, "two"], "b": {"c": 3}}"#).unwrap();
        let value = Value::from_json(&json).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["a"].as_array().unwrap()[0], Value::Integer(1));
        assert_eq!(obj["a"].as_array().unwrap()[1], Value::Text("two".into()));
        assert_eq!(obj["b"].as_object().unwrap()["c"], Value::Integer(3));
    }

    #[test]
    fn floats_and_nulls_are_rejected() {
        let json: JsonValue = serde_json::from_str("1.5").unwrap();
        assert!(Value::from_json(&json).is_err());
        assert!(Value::from_json(&JsonValue::Null).is_err());
    }

    #[test]
    fn uint_accepts_big_decimal_strings() {
        let value = Value::Text("340282366920938463463374607431768211455".into());
        assert_eq!(value.expect_uint("gasLimit").unwrap(), u128::MAX);
        assert!(Value::Text("-1".into()).expect_uint("gasLimit").is_err());
        assert!(Value::Integer(-1).expect_uint("gasLimit").is_err());
    }
}
