//! # Key Management
//!
//! secp256k1 keypairs for the in-process development signer.
//!
//! Production attestations are signed by an external wallet and the core
//! never sees the private key. This type exists so the CLI can act as its
//! own wallet during development, and so tests have a real signer behind
//! the signature port.
//!
//! Key bytes are never logged. Keep it that way.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use super::signatures::{RecoverableSignature, SignatureError};
use crate::identity::Address;

/// Errors that can occur while loading a key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("secret key is not valid hex")]
    InvalidHex,
}

/// A secp256k1 signing key together with the address it controls.
///
/// Intentionally does not implement `Serialize`. Writing a private key
/// somewhere should be a deliberate call to [`SignerKeypair::secret_key_bytes`].
#[derive(Clone)]
pub struct SignerKeypair {
    signing_key: SigningKey,
    address: Address,
}

impl SignerKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Load a keypair from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, KeyError> {
        let signing_key = SigningKey::from_slice(secret).map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Load a keypair from hex, with or without a `0x` prefix. Surrounding
    /// whitespace is ignored so key files with a trailing newline work.
    pub fn from_hex(secret_hex: &str) -> Result<Self, KeyError> {
        let trimmed = secret_hex.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits).map_err(|_| KeyError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::from_public_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// The address this key signs as.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Raw 32-byte secret scalar.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    /// Sign a 32-byte digest, producing a recoverable `r || s || v`
    /// signature with `v` in `{27, 28}` as wallets emit it.
    ///
    /// The signature is deterministic (RFC 6979) and low-s normalized.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, SignatureError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|_| SignatureError::SigningFailed)?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = 27 + recovery_id.to_byte();
        Ok(RecoverableSignature::from_bytes(bytes))
    }
}

impl fmt::Debug for SignerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
