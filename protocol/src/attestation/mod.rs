//! # Attestation Module
//!
//! Building, signing and verifying spending attestations.
//!
//! ## Architecture
//!
//! ```text
//! predicate.rs   - the "sum(<category>) >= <threshold>" assertion
//! message.rs     - AttestationMessage and its nonce
//! typed_data.rs  - structured-data hashing (domain, type hash, digest)
//! signer.rs      - SignaturePort, the boundary to whoever holds the key
//! proof.rs       - generate_proof and the ProofBundle it returns
//! verifier.rs    - verify / verify_at and their reason codes
//! error.rs       - generation-side errors
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build**: [`build_attestation`] commits to a category's transactions
//!    and wraps the root in an unsigned [`AttestationMessage`].
//! 2. **Sign**: a [`SignaturePort`] signs the [`TypedData`] payload. The
//!    user may decline; that is a cancellation, not a failure.
//! 3. **Transport**: the [`ProofBundle`] goes to a verifier by whatever
//!    means the application uses.
//! 4. **Verify**: [`verify`] recovers the signer, checks expiry and, when
//!    given the data, recomputes the root and re-checks the predicate.
//!
//! This is not a zero-knowledge system. A verifier given the transaction set
//! sees it; the attestation only makes after-the-fact tampering detectable.
//! There is no revocation and no freshness guarantee beyond `expiresAt`.

pub mod error;
pub mod message;
pub mod predicate;
pub mod proof;
pub mod signer;
pub mod typed_data;
pub mod verifier;

pub use error::AttestationError;
pub use message::{build_attestation, AttestationMessage, Nonce};
pub use predicate::Predicate;
pub use proof::{generate_proof, ProofBundle, ProofRequest};
pub use signer::{LocalSigner, SignaturePort, SignatureResponse, SignerError};
pub use typed_data::{domain_separator, signing_digest, TypedData};
pub use verifier::{verify, verify_at, RejectReason, VerificationResult};

/// Current wall-clock time in unix seconds. A clock before 1970 reads as 0.
pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
