// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Spend Attest - Core Library
//!
//! Lets a user prove to a third party that their spending in a category
//! reaches a threshold, without handing over the raw bank transactions up
//! front. The user's wallet signs a statement binding the category total to
//! a commitment over the underlying transactions; a verifier later checks
//! the signature and expiry and, if it is given the transactions, recomputes
//! the commitment and re-checks the claim.
//!
//! ## Architecture
//!
//! - **transaction**: the bank transaction record and category summaries.
//! - **commitment**: canonical, order-independent Keccak-256 root over a category.
//! - **attestation**: message building, the signer boundary, and verification.
//! - **crypto**: Keccak-256 and recoverable secp256k1 signatures.
//! - **identity**: 20-byte signer addresses with checksummed text form.
//! - **config**: schema constants and protocol parameters.
//!
//! ## Ground Rules
//!
//! 1. Money is integers. Amounts become minor units before anything is hashed or summed.
//! 2. No private keys in the core. Signing happens behind [`attestation::SignaturePort`].
//! 3. Verification never panics and never errors; it returns a reason code.

pub mod attestation;
pub mod commitment;
pub mod config;
pub mod crypto;
pub mod identity;
pub mod transaction;
