//! # Protocol Configuration & Constants
//!
//! Every fixed value of the attestation schema lives here. External signers
//! reproduce the same typed-data schema byte for byte, so changing any of
//! the schema constants below invalidates every signature already issued.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Schema Identifiers
// ---------------------------------------------------------------------------

/// Schema tag carried in every attestation message.
pub const SCHEMA_ID: &str = "plaid.sum.v1";

/// Intended audience of the attestation. Verifiers outside this audience
/// should not accept it, though the core does not enforce that.
pub const AUDIENCE: &str = "privy-plaid-demo";

/// Typed-data domain name handed to the signer.
pub const DOMAIN_NAME: &str = "PlaidAttestation";

/// Typed-data domain version handed to the signer.
pub const DOMAIN_VERSION: &str = "1";

/// Primary type name of the signed struct.
pub const PRIMARY_TYPE: &str = "Attestation";

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long an attestation stays valid after issuance, in seconds. One day.
pub const VALIDITY_WINDOW_SECS: u64 = 60 * 60 * 24;

/// Width of the coarse time bucket folded into the commitment, in seconds.
pub const TIME_BUCKET_SECS: u64 = 60 * 10;

/// Default upper bound on how long we wait for an external signer.
/// Users take their time reading a wallet prompt; two minutes is generous.
pub const DEFAULT_SIGNER_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// Random nonce length in bytes (`bytes32`).
pub const NONCE_LENGTH: usize = 32;

/// Commitment root length in bytes (`bytes32`).
pub const ROOT_LENGTH: usize = 32;

/// Recoverable secp256k1 signature length: `r (32) || s (32) || v (1)`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Account address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Minor units per display-currency unit (cents per dollar).
pub const MINOR_UNITS_PER_UNIT: i64 = 100;

/// Label used for transactions that carry no category at all.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Crate version, reported by the node binary.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
