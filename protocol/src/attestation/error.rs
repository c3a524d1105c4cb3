//! Error types for attestation generation.
//!
//! Verification never fails with an error: it always produces a
//! [`super::VerificationResult`]. Everything here belongs to the generating
//! side, where a failure means "no proof was produced".

use thiserror::Error;

use super::signer::SignerError;
use crate::commitment::CommitmentError;

/// Errors that can occur while building or signing an attestation.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// The transaction data or category cannot be committed to.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The category total does not reach the requested threshold, so the
    /// predicate would be false.
    #[error("category total {value} is below threshold {threshold} (minor units)")]
    ThresholdNotMet {
        /// Exact category total.
        value: i64,
        /// Requested threshold.
        threshold: u64,
    },

    /// The OS random source could not supply a nonce.
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    /// The canonical commitment encoding could not be produced.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The signature port did not return a usable signature.
    #[error("signing failed: {0}")]
    Signing(#[from] SignerError),
}

impl AttestationError {
    /// The user declined to sign. Not an error to report loudly, and never
    /// something to retry automatically.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::Signing(SignerError::Declined))
    }

    /// A transient signer failure the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Signing(e) if e.is_retryable())
    }
}

impl From<CommitmentError> for AttestationError {
    fn from(err: CommitmentError) -> Self {
        match err {
            CommitmentError::Serialization(e) => Self::Serialization(e.to_string()),
            other => Self::MalformedInput(other.to_string()),
        }
    }
}
