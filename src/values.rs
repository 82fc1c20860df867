use crate::address::Address;
use minicbor::{encode, Encoder};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of decimal places carried by [`UFix64`]
pub const UFIX64_DECIMALS: u32 = 8;
const UFIX64_SCALE: u64 = 10u64.pow(UFIX64_DECIMALS);

/// Typed argument passed to, or value returned from, ledger code.
///
/// The JSON form is `{"type": "<Variant>", "value": ...}`, which is what the remote access API
/// and the CLI `--args` flag speak.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// No value
    Void,
    /// Possibly absent value
    Optional(Option<Box<Value>>),
    #[allow(missing_docs)]
    Bool(bool),
    #[allow(missing_docs)]
    String(String),
    /// Signed integer
    Int(i64),
    #[allow(missing_docs)]
    UInt64(u64),
    /// Unsigned fixed point number with eight decimals
    UFix64(UFix64),
    /// Account address
    Address(Address),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Key/value pairs, order preserved
    Dictionary(Vec<(Value, Value)>),
}

impl Value {
    #[allow(missing_docs)]
    pub fn string(s: &str) -> Self {
        Value::String(s.to_string())
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(inner) => Some(inner),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(inner) => Some(*inner),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(inner) => Some(*inner),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(inner) => Some(*inner),
            Value::Int(inner) => u64::try_from(*inner).ok(),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Canonical CBOR encoding. Every value is a two element array of a type tag and its
    /// contents, so that equal values always produce equal bytes.
    pub fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Value::Void => {
                e.u8(0)?.null()?;
            }
            Value::Optional(inner) => {
                e.u8(1)?;
                match inner {
                    Some(value) => value.encode(e)?,
                    None => {
                        e.null()?;
                    }
                }
            }
            Value::Bool(inner) => {
                e.u8(2)?.bool(*inner)?;
            }
            Value::String(inner) => {
                e.u8(3)?.str(inner)?;
            }
            Value::Int(inner) => {
                e.u8(4)?.i64(*inner)?;
            }
            Value::UInt64(inner) => {
                e.u8(5)?.u64(*inner)?;
            }
            Value::UFix64(inner) => {
                e.u8(6)?.u64(inner.raw())?;
            }
            Value::Address(inner) => {
                e.u8(7)?.bytes(inner.as_bytes())?;
            }
            Value::Array(items) => {
                e.u8(8)?.array(items.len() as u64)?;
                for item in items {
                    item.encode(e)?;
                }
            }
            Value::Dictionary(entries) => {
                e.u8(9)?.array(entries.len() as u64)?;
                for (key, value) in entries {
                    e.array(2)?;
                    key.encode(e)?;
                    value.encode(e)?;
                }
            }
        }
        Ok(())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt64(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Address> for Value {
    fn from(addr: Address) -> Self {
        Value::Address(addr)
    }
}

impl From<UFix64> for Value {
    fn from(n: UFix64) -> Self {
        Value::UFix64(n)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("Not a valid UFix64: {0:?}")]
    InvalidUFix64(String),
}

/// Unsigned fixed point number with [`UFIX64_DECIMALS`] decimal places
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct UFix64(u64);

impl UFix64 {
    /// From the raw scaled integer, e.g. `100_000_000` is `1.0`
    pub fn from_raw(raw: u64) -> Self {
        UFix64(raw)
    }

    /// The raw scaled integer
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl FromStr for UFix64 {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::InvalidUFix64(s.to_string());
        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };
        if whole.is_empty()
            || fraction.len() > UFIX64_DECIMALS as usize
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let padded = format!("{:0<width$}", fraction, width = UFIX64_DECIMALS as usize);
        let fraction: u64 = padded.parse().map_err(|_| invalid())?;
        whole
            .checked_mul(UFIX64_SCALE)
            .and_then(|n| n.checked_add(fraction))
            .map(UFix64)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for UFix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / UFIX64_SCALE,
            self.0 % UFIX64_SCALE,
            width = UFIX64_DECIMALS as usize
        )
    }
}

impl Serialize for UFix64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UFix64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ufix64_parses_and_prints() {
        let amount: UFix64 = "10.0".parse().unwrap();
        assert_eq!(amount.raw(), 1_000_000_000);
        assert_eq!(amount.to_string(), "10.00000000");
        let tiny: UFix64 = "0.00000001".parse().unwrap();
        assert_eq!(tiny.raw(), 1);
        assert!("1.000000001".parse::<UFix64>().is_err());
        assert!("-1.0".parse::<UFix64>().is_err());
        assert!(".5".parse::<UFix64>().is_err());
    }

    #[test]
    fn json_form_is_type_tagged() {
        let value = Value::Array(vec![
            Value::string("hi"),
            Value::UFix64("1.5".parse().unwrap()),
            Value::Address(Address::from(1)),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        let expected = serde_json::json!({
            "type": "Array",
            "value": [
                {"type": "String", "value": "hi"},
                {"type": "UFix64", "value": "1.50000000"},
                {"type": "Address", "value": "0x0000000000000001"},
            ]
        });
        assert_eq!(json, expected);
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn encoding_distinguishes_types_with_equal_contents() {
        let encode = |v: &Value| {
            let mut e = Encoder::new(Vec::new());
            v.encode(&mut e).unwrap();
            e.into_writer()
        };
        assert_ne!(encode(&Value::Int(5)), encode(&Value::UInt64(5)));
        assert_ne!(
            encode(&Value::UInt64(5)),
            encode(&Value::UFix64(UFix64::from_raw(5)))
        );
        assert_eq!(encode(&Value::string("x")), encode(&Value::string("x")));
    }
}
