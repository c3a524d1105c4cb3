//! # Recoverable Signatures
//!
//! A recoverable ECDSA signature carries, besides `(r, s)`, one byte `v`
//! that selects which of the candidate public keys produced it. That lets a
//! verifier recover the signer's address from the message digest and the
//! signature alone, then compare it against whoever *claims* to have signed.
//!
//! `v` shows up in the wild as either `0/1` or `27/28`. Both are accepted.
//! High-s signatures are rejected by `k256`, which matches what wallets emit.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::SIGNATURE_LENGTH;
use crate::identity::Address;

/// Errors during signature parsing, signing and recovery.
///
/// Deliberately coarse. A verifier maps every one of them to the same
/// `bad_signature` outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("signature is not valid hex")]
    InvalidHex,

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature scalars")]
    MalformedScalars,

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("signing failed")]
    SigningFailed,
}

/// A 65-byte `r || s || v` secp256k1 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct RecoverableSignature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl RecoverableSignature {
    /// Wrap raw signature bytes. No validation happens until recovery.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parse from a byte slice of exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: [u8; SIGNATURE_LENGTH] =
            bytes.try_into().map_err(|_| SignatureError::InvalidLength {
                expected: SIGNATURE_LENGTH,
                got: bytes.len(),
            })?;
        Ok(Self { bytes })
    }

    /// Parse from `0x`-prefixed or bare hex.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let digits = s.trim().strip_prefix("0x").unwrap_or(s.trim());
        let raw = hex::decode(digits).map_err(|_| SignatureError::InvalidHex)?;
        Self::from_slice(&raw)
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    fn recovery_id(&self) -> Result<RecoveryId, SignatureError> {
        let v = self.bytes[64];
        let normalized = match v {
            0 | 1 => v,
            27 | 28 => v - 27,
            other => return Err(SignatureError::InvalidRecoveryId(other)),
        };
        RecoveryId::from_byte(normalized).ok_or(SignatureError::InvalidRecoveryId(v))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Recover the address that produced `signature` over `digest`.
pub fn recover_address(
    digest: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<Address, SignatureError> {
    let recovery_id = signature.recovery_id()?;
    let sig = Signature::from_slice(&signature.bytes[..64])
        .map_err(|_| SignatureError::MalformedScalars)?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(Address::from_public_key(&key))
}
