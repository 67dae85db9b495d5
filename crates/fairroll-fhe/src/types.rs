//! addresses, ciphertext handles and encrypted types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// handle layout version, stored in the last byte
pub const HANDLE_VERSION: u8 = 1;

/// 20-byte account / contract address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// deterministic address for a label (local deployments and tests)
    pub fn derive(label: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"fairroll:address:v1");
        hasher.update(label);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// left-padded 32-byte abi word
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| Error::InvalidEncoding(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| Error::InvalidEncoding(format!("address must be 20 bytes: {s}")))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// encrypted integer types supported by the runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FheType {
    Bool,
    Uint8,
    Uint64,
}

impl FheType {
    /// type tag as stored in byte 30 of a handle
    pub const fn tag(self) -> u8 {
        match self {
            FheType::Bool => 0,
            FheType::Uint8 => 2,
            FheType::Uint64 => 5,
        }
    }

    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FheType::Bool),
            2 => Some(FheType::Uint8),
            5 => Some(FheType::Uint64),
            _ => None,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint64 => 64,
        }
    }

    pub const fn max_value(self) -> u64 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => u8::MAX as u64,
            FheType::Uint64 => u64::MAX,
        }
    }

    pub const fn fits(self, value: u64) -> bool {
        value <= self.max_value()
    }

    /// reduce a value modulo the type width
    pub const fn wrap(self, value: u64) -> u64 {
        value & self.max_value()
    }
}

impl fmt::Display for FheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FheType::Bool => f.write_str("ebool"),
            FheType::Uint8 => f.write_str("euint8"),
            FheType::Uint64 => f.write_str("euint64"),
        }
    }
}

/// opaque reference to a ciphertext held by the runtime
///
/// bytes 0..30 identify the ciphertext, byte 30 is the [`FheType`] tag and
/// byte 31 is [`HANDLE_VERSION`]. the all-zero value is [`Handle::EMPTY`],
/// meaning "never written". only a runtime mints non-empty handles.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle([u8; 32]);

impl Handle {
    /// sentinel for a slot that was never written, not an encrypted zero
    pub const EMPTY: Handle = Handle([0u8; 32]);

    pub(crate) fn mint(digest: &[u8; 32], ty: FheType) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..30].copy_from_slice(&digest[..30]);
        bytes[30] = ty.tag();
        bytes[31] = HANDLE_VERSION;
        Self(bytes)
    }

    pub(crate) fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// encrypted type encoded in the handle, `None` for the sentinel
    pub fn fhe_type(&self) -> Option<FheType> {
        if self.is_empty() || self.0[31] != HANDLE_VERSION {
            return None;
        }
        FheType::from_tag(self.0[30])
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Handle(empty)");
        }
        write!(f, "Handle(0x{}..)", hex::encode(&self.0[..6]))
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// wire boundary: a decoded handle is only meaningful if a runtime minted it
impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(raw).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("handle must be 32 bytes"))?;
        Ok(Self(arr))
    }
}
