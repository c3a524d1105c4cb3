//! Signer identities as 20-byte account addresses.
//!
//! An address is the last 20 bytes of `keccak256(pubkey)`, where `pubkey` is
//! the 64-byte uncompressed secp256k1 point without its `0x04` prefix. It is
//! displayed with EIP-55 mixed-case checksum encoding.
//!
//! Equality is byte equality. Two strings naming the same account in
//! different casings parse to equal [`Address`] values, which is the
//! canonical comparison the verifier relies on.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::ADDRESS_LENGTH;
use crate::crypto::hash::keccak256;

/// Errors when parsing an address string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must be {expected} hex characters, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("address contains non-hex characters")]
    InvalidHex,

    #[error("mixed-case address fails its checksum")]
    BadChecksum,
}

/// A 20-byte account address identifying a signer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wrap raw address bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive the address controlled by a secp256k1 public key.
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // Skip the 0x04 uncompressed-point tag.
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// EIP-55 checksummed representation, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Accepts `0x`-prefixed or bare hex. All-lowercase and all-uppercase
    /// inputs are accepted as-is; mixed case must carry a valid checksum.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LENGTH * 2,
                got: digits.len(),
            });
        }

        let raw = hex::decode(digits).map_err(|_| AddressError::InvalidHex)?;
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&raw);
        let address = Self(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(AddressError::BadChecksum);
        }

        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
