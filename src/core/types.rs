//! Account and chain identifiers, plus the public connection status.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Length of an account identifier in bytes.
pub const ADDRESS_BYTES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be {expected} hex characters, got {got}")]
    Length { expected: usize, got: usize },
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

/// A 20-byte account identifier. Displays lower-cased so comparisons and
/// persisted forms are stable regardless of the checksum casing the wallet
/// hands back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(alloy_primitives::Address);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(trimmed.to_string()))?;
        if body.len() != ADDRESS_BYTES * 2 {
            return Err(AddressError::Length { expected: ADDRESS_BYTES * 2, got: body.len() });
        }
        let bytes = hex::decode(body).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Ok(Self(alloy_primitives::Address::from_slice(&bytes)))
    }

    /// The underlying EVM address, for ABI encoding.
    pub fn as_alloy(&self) -> alloy_primitives::Address { self.0 }

    /// EIP-55 mixed-case form, for display only.
    pub fn to_checksum(&self) -> String { self.0.to_checksum(None) }

    pub fn to_bytes(&self) -> [u8; ADDRESS_BYTES] {
        let mut out = [0u8; ADDRESS_BYTES];
        out.copy_from_slice(self.0.as_slice());
        out
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(address: alloy_primitives::Address) -> Self { Self(address) }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "0x{}", hex::encode(self.0.as_slice())) }
}

impl std::str::FromStr for Address {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// EVM chain id. Wallets speak it as a `0x` hex quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn to_hex(&self) -> String { format!("{:#x}", self.0) }

    /// Accepts `0x`-prefixed hex (what EIP-1193 returns) or plain decimal.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok().map(ChainId),
            None => raw.parse().ok().map(ChainId),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chain id: {0}")]
pub struct InvalidChainId(pub String);

impl std::str::FromStr for ChainId {
    type Err = InvalidChainId;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s).ok_or_else(|| InvalidChainId(s.trim().to_string())) }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self { ChainId(id) }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<ChainId>().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle phase exposed to UI code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }

    pub fn is_connected(&self) -> bool { matches!(self, ConnectionStatus::Connected) }
}
