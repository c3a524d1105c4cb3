//! # Hashing Utilities
//!
//! Keccak-256 is the only hash this crate uses. It is what the typed-data
//! signing scheme is defined over, what account addresses are derived with,
//! and (to stay interoperable with the wallet side) what the commitment root
//! is computed with.
//!
//! Note that Keccak-256 is *not* FIPS-202 SHA3-256: the padding byte differs.
//! `sha3::Keccak256` is the pre-standard variant, which is what we want.

use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of the input data.
///
/// # Example
///
/// ```
/// use spend_attest::crypto::keccak256;
///
/// let hash = keccak256(b"spend attest");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Used for typed-data encoding, where the pre-image is a run of 32-byte
/// words plus a short prefix.
pub fn keccak256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Left-pad a `u64` into a 32-byte big-endian word, as ABI encoding does
/// for every unsigned integer width.
pub fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}
