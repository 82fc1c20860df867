use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Length in bytes of an on-chain account address
pub const ADDRESS_LENGTH: usize = 8;

/// Domain representation of an account address on the ledger.
///
/// Parsed from hex with or without the `0x` prefix. Short forms are left-padded, so `0x01`
/// and `0x0000000000000001` are the same address. Always displayed as `0x` followed by
/// sixteen lowercase hex digits.
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,
    #[error("Address {0:?} is longer than {ADDRESS_LENGTH} bytes")]
    TooLong(String),
    #[error("Address {0:?} is not valid hex")]
    NotHex(String),
}

impl Address {
    /// Construct from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Address(bytes)
    }

    /// Parse a hex address, with or without the `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let digits = remove_hex_prefix(s.trim());
        if digits.is_empty() {
            return Err(AddressError::Empty);
        }
        if digits.len() > ADDRESS_LENGTH * 2 {
            return Err(AddressError::TooLong(s.to_string()));
        }
        let padded = format!("{:0>width$}", digits, width = ADDRESS_LENGTH * 2);
        let decoded = hex::decode(padded).map_err(|_| AddressError::NotHex(s.to_string()))?;
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&decoded);
        Ok(Address(bytes))
    }

    /// Raw bytes of the address
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Hex without the `0x` prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value.to_be_bytes())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_hex(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Address at position `index` of the deterministic sequence the embedded ledger hands out.
/// Index 0 is the service account.
pub fn sequence_address(index: u64) -> Address {
    Address::from(index.saturating_add(1))
}

/// Position of `address` in the embedded ledger's address sequence, if it is part of it
pub fn sequence_index(address: &Address) -> Option<u64> {
    u64::from_be_bytes(address.0).checked_sub(1)
}

/// Remove `0x` from the beginning of the string, if present
pub fn remove_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Prepend `0x` to the string, unless it is already there
pub fn prepend_hex_prefix(s: &str) -> String {
    if s.starts_with("0x") {
        s.to_string()
    } else {
        format!("0x{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_is_left_padded() {
        let short = Address::from_hex("0x01").unwrap();
        let long = Address::from_hex("0000000000000001").unwrap();
        assert_eq!(short, long);
        assert_eq!(short.to_string(), "0x0000000000000001");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Address::from_hex("0x"), Err(AddressError::Empty));
        assert!(matches!(
            Address::from_hex("0xnothex"),
            Err(AddressError::NotHex(_))
        ));
        assert!(matches!(
            Address::from_hex("0x01020304050607080910"),
            Err(AddressError::TooLong(_))
        ));
    }

    #[test]
    fn hex_prefix_helpers() {
        assert_eq!(remove_hex_prefix("0xabc"), "abc");
        assert_eq!(remove_hex_prefix("abc"), "abc");
        assert_eq!(prepend_hex_prefix("abc"), "0xabc");
        assert_eq!(prepend_hex_prefix("0xabc"), "0xabc");
    }

    #[test]
    fn sequence_is_invertible() {
        for index in [0, 1, 2, 41] {
            assert_eq!(sequence_index(&sequence_address(index)), Some(index));
        }
        assert_eq!(sequence_index(&Address::new([0; ADDRESS_LENGTH])), None);
    }

    #[test]
    fn serde_uses_prefixed_hex() {
        let addr = Address::from(2);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000002\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
