//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers around audited implementations:
//!
//! - **Keccak-256** (`sha3`) for every hash in the protocol.
//! - **secp256k1 ECDSA** (`k256`) with public-key recovery, which is how a
//!   verifier learns who signed a typed-data message without being handed a
//!   public key.
//!
//! The core never needs a private key. [`keys::SignerKeypair`] exists for
//! the in-process development signer and for tests.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{keccak256, keccak256_multi};
pub use keys::SignerKeypair;
pub use signatures::{recover_address, RecoverableSignature, SignatureError};
