//! # Proof Generation
//!
//! Ties the pieces together on the user's side:
//!
//! ```text
//! transactions ──► CommittedSet ──► AttestationMessage ──► SignaturePort ──► ProofBundle
//! ```
//!
//! The bundle carries the generator's time bucket next to the signed
//! message. The bucket is not part of the signed schema (that schema is
//! fixed), but it is fully determined by the signed `issuedAt`, and the
//! verifier checks the two agree.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::AttestationError;
use super::message::{AttestationMessage, Nonce};
use super::signer::{SignaturePort, SignerError};
use super::typed_data::TypedData;
use crate::commitment::{CommittedSet, TimeBucket};
use crate::crypto::signatures::{recover_address, RecoverableSignature};
use crate::identity::Address;
use crate::transaction::TransactionRecord;

/// A signed attestation ready for transport to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    pub message: AttestationMessage,
    pub signature: RecoverableSignature,
    /// Identity the signer claimed when it returned the signature.
    pub signer: Address,
    /// Time bucket the commitment root was derived in.
    pub time_bucket: TimeBucket,
}

/// Parameters of one proof request.
#[derive(Debug, Clone, Copy)]
pub struct ProofRequest<'a> {
    pub transactions: &'a [TransactionRecord],
    pub category: &'a str,
    /// Threshold in minor units; the total must reach it.
    pub threshold_minor_units: u64,
    /// Issuance time, unix seconds.
    pub now: u64,
    /// How long to wait for the signer before giving up.
    pub signer_timeout: Duration,
}

/// Build, sign and bundle an attestation.
///
/// # Errors
///
/// - [`AttestationError::MalformedInput`] / [`AttestationError::RandomSource`]
///   from building the message.
/// - [`AttestationError::ThresholdNotMet`] when the total is below the
///   threshold. No signature is requested for a false statement.
/// - [`AttestationError::Signing`] when the signer declines, times out, is
///   unreachable, or returns a signature that does not recover to the
///   address it claims.
pub async fn generate_proof<P>(
    port: &P,
    request: ProofRequest<'_>,
) -> Result<ProofBundle, AttestationError>
where
    P: SignaturePort + ?Sized,
{
    let set = CommittedSet::select(request.transactions, request.category)?;
    let total = set.total_minor_units();
    if total < 0 || (total as u64) < request.threshold_minor_units {
        return Err(AttestationError::ThresholdNotMet {
            value: total,
            threshold: request.threshold_minor_units,
        });
    }

    let message = AttestationMessage::assemble(
        &set,
        request.threshold_minor_units,
        request.now,
        Nonce::random()?,
    )?;
    let typed = TypedData::new(message);

    let response = match tokio::time::timeout(request.signer_timeout, port.sign_typed_data(&typed)).await {
        Ok(Ok(response)) => response,
        Ok(Err(SignerError::Declined)) => {
            info!(category = request.category, "user declined to sign attestation");
            return Err(SignerError::Declined.into());
        }
        Ok(Err(e)) => {
            warn!(category = request.category, error = %e, "signer failed");
            return Err(e.into());
        }
        Err(_) => {
            warn!(category = request.category, timeout = ?request.signer_timeout, "signer timed out");
            return Err(SignerError::Timeout(request.signer_timeout).into());
        }
    };

    let recovered = recover_address(&typed.digest(), &response.signature)
        .map_err(|e| SignerError::InvalidResponse(e.to_string()))?;
    if recovered != response.signer {
        return Err(SignerError::InvalidResponse(format!(
            "signature recovers to {} but signer claimed {}",
            recovered, response.signer
        ))
        .into());
    }

    let message = typed.into_message();
    info!(
        category = request.category,
        signer = %response.signer,
        value_cents = message.value_cents,
        "attestation signed"
    );

    Ok(ProofBundle {
        time_bucket: message.time_bucket(),
        message,
        signature: response.signature,
        signer: response.signer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::signer::{LocalSigner, SignatureResponse};
    use crate::crypto::keys::SignerKeypair;
    use async_trait::async_trait;

    const NOW: u64 = 1_704_067_200;

    fn sample() -> Vec<TransactionRecord> {
        vec![
            TransactionRecord::new("1", 12.34, vec!["Food".into()], "2024-01-01".parse().unwrap()),
            TransactionRecord::new("2", 7.66, vec!["Food".into()], "2024-01-02".parse().unwrap()),
        ]
    }

    fn request(txs: &[TransactionRecord], threshold: u64) -> ProofRequest<'_> {
        ProofRequest {
            transactions: txs,
            category: "Food",
            threshold_minor_units: threshold,
            now: NOW,
            signer_timeout: Duration::from_secs(5),
        }
    }

    struct Declining;

    #[async_trait]
    impl SignaturePort for Declining {
        async fn sign_typed_data(&self, _: &TypedData) -> Result<SignatureResponse, SignerError> {
            Err(SignerError::Declined)
        }
    }

    struct Silent;

    #[async_trait]
    impl SignaturePort for Silent {
        async fn sign_typed_data(&self, _: &TypedData) -> Result<SignatureResponse, SignerError> {
            std::future::pending().await
        }
    }

    /// Signs with one key but claims to be another.
    struct Impostor {
        inner: LocalSigner,
        claimed: Address,
    }

    #[async_trait]
    impl SignaturePort for Impostor {
        async fn sign_typed_data(&self, req: &TypedData) -> Result<SignatureResponse, SignerError> {
            let mut response = self.inner.sign_typed_data(req).await?;
            response.signer = self.claimed;
            Ok(response)
        }
    }

    #[tokio::test]
    async fn produces_bundle_with_generation_bucket() {
        let txs = sample();
        let signer = LocalSigner::new(SignerKeypair::generate());
        let bundle = generate_proof(&signer, request(&txs, 1000)).await.unwrap();

        assert_eq!(bundle.signer, signer.address());
        assert_eq!(bundle.time_bucket, TimeBucket::at(NOW));
        assert_eq!(bundle.message.value_cents, 2000);
        assert_eq!(bundle.message.predicate, "sum(Food) >= 10");
    }

    #[tokio::test]
    async fn below_threshold_is_refused_before_signing() {
        let txs = sample();
        let err = generate_proof(&Declining, request(&txs, 2001)).await.unwrap_err();
        assert!(matches!(
            err,
            AttestationError::ThresholdNotMet {
                value: 2000,
                threshold: 2001
            }
        ));
    }

    #[tokio::test]
    async fn declined_signature_is_a_cancellation() {
        let txs = sample();
        let err = generate_proof(&Declining, request(&txs, 1000)).await.unwrap_err();
        assert!(err.is_user_cancelled());
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_signer_times_out() {
        let txs = sample();
        let err = generate_proof(&Silent, request(&txs, 1000)).await.unwrap_err();
        assert!(matches!(err, AttestationError::Signing(SignerError::Timeout(_))));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn mismatched_claimed_signer_is_rejected() {
        let txs = sample();
        let impostor = Impostor {
            inner: LocalSigner::new(SignerKeypair::generate()),
            claimed: SignerKeypair::generate().address(),
        };
        let err = generate_proof(&impostor, request(&txs, 1000)).await.unwrap_err();
        assert!(matches!(
            err,
            AttestationError::Signing(SignerError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn works_through_a_trait_object() {
        let txs = sample();
        let port: Box<dyn SignaturePort> = Box::new(LocalSigner::new(SignerKeypair::generate()));
        assert!(generate_proof(port.as_ref(), request(&txs, 0)).await.is_ok());
    }

    #[test]
    fn bundle_json_round_trip_keeps_bucket() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let txs = sample();
        let signer = LocalSigner::new(SignerKeypair::generate());
        let bundle = rt.block_on(generate_proof(&signer, request(&txs, 1000))).unwrap();

        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["timeBucket"], NOW / 600);
        let back: ProofBundle = serde_json::from_value(json).unwrap();
        assert_eq!(back, bundle);
    }
}
