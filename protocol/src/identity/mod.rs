//! # Signer Identity
//!
//! The identity layer that authenticates *users* is an external concern.
//! What the core needs is narrower: a way to name the key that signed an
//! attestation, and a canonical way to compare two such names.

pub mod address;

pub use address::{Address, AddressError};
