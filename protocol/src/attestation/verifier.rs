//! # Verifier
//!
//! Decides whether a [`ProofBundle`] is acceptable. Verification never
//! fails with an error; every outcome is a [`VerificationResult`] carrying
//! at most one reason, the first check that failed:
//!
//! | Step | Check                                              | Reason                  |
//! |------|----------------------------------------------------|-------------------------|
//! | 1    | signature recovers to the claimed identity         | `bad_signature`         |
//! | 2    | signed fields are well-formed                      | `malformed_input`       |
//! | 3    | `now < expiresAt`                                  | `expired`               |
//! | 4    | supplied data commits in the carried bucket        | `malformed_input`       |
//! | 5    | recomputed root equals the signed root (with data) | `invalid_root`          |
//! | 6    | predicate holds for the supplied data (with data)  | `predicate_unsatisfied` |
//!
//! Any edit to a signed field lands on step 1. Steps 4 to 6 run only when
//! both a transaction set and a category are supplied. The root is
//! recomputed in the bucket carried by the bundle, so the outcome does not
//! depend on how long after generation verification happens (only on
//! expiry).

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::message::AttestationMessage;
use super::predicate::Predicate;
use super::proof::ProofBundle;
use super::typed_data::signing_digest;
use super::unix_now;
use crate::commitment::CommittedSet;
use crate::config::{AUDIENCE, SCHEMA_ID};
use crate::crypto::signatures::recover_address;
use crate::identity::Address;
use crate::transaction::TransactionRecord;

/// Why a bundle was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    BadSignature,
    Expired,
    InvalidRoot,
    PredicateUnsatisfied,
    MalformedInput,
}

impl RejectReason {
    pub const ALL: [RejectReason; 5] = [
        Self::BadSignature,
        Self::Expired,
        Self::InvalidRoot,
        Self::PredicateUnsatisfied,
        Self::MalformedInput,
    ];

    /// Wire code for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::InvalidRoot => "invalid_root",
            Self::PredicateUnsatisfied => "predicate_unsatisfied",
            Self::MalformedInput => "malformed_input",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<RejectReason>,
}

impl VerificationResult {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

/// Verify `bundle` against `claimed` at the current wall-clock time.
pub fn verify(
    bundle: &ProofBundle,
    claimed: &Address,
    transactions: Option<&[TransactionRecord]>,
    category: Option<&str>,
) -> VerificationResult {
    verify_at(bundle, claimed, transactions, category, unix_now())
}

/// Verify `bundle` as of `now` (unix seconds).
pub fn verify_at(
    bundle: &ProofBundle,
    claimed: &Address,
    transactions: Option<&[TransactionRecord]>,
    category: Option<&str>,
    now: u64,
) -> VerificationResult {
    let result = run_checks(bundle, claimed, transactions, category, now);
    match result.reason {
        None => info!(signer = %claimed, "attestation accepted"),
        Some(reason) => warn!(signer = %claimed, %reason, "attestation rejected"),
    }
    result
}

fn run_checks(
    bundle: &ProofBundle,
    claimed: &Address,
    transactions: Option<&[TransactionRecord]>,
    category: Option<&str>,
    now: u64,
) -> VerificationResult {
    let msg = &bundle.message;

    // Step 1: signature. Covers every signed field.
    match recover_address(&signing_digest(msg), &bundle.signature) {
        Ok(recovered) if recovered == *claimed => {}
        Ok(recovered) => {
            debug!(%recovered, %claimed, "signature recovers to a different address");
            return VerificationResult::reject(RejectReason::BadSignature);
        }
        Err(e) => {
            debug!(error = %e, "signature recovery failed");
            return VerificationResult::reject(RejectReason::BadSignature);
        }
    }

    // Step 2: a genuine signature over something that is not one of ours.
    if let Err(problem) = check_signed_fields(msg) {
        debug!(problem, "signed message is malformed");
        return VerificationResult::reject(RejectReason::MalformedInput);
    }

    // Step 3: expiry. No grace period.
    if msg.is_expired_at(now) {
        return VerificationResult::reject(RejectReason::Expired);
    }

    // Remaining steps need the underlying data.
    let (Some(transactions), Some(category)) = (transactions, category) else {
        return VerificationResult::accept();
    };

    // Step 4: inputs to the recomputation.
    if category.is_empty() {
        debug!("empty category supplied");
        return VerificationResult::reject(RejectReason::MalformedInput);
    }
    if bundle.time_bucket != msg.time_bucket() {
        debug!(
            carried = bundle.time_bucket.0,
            expected = msg.time_bucket().0,
            "time bucket does not match issuedAt"
        );
        return VerificationResult::reject(RejectReason::MalformedInput);
    }
    let set = match CommittedSet::select(transactions, category) {
        Ok(set) => set,
        Err(e) => {
            debug!(error = %e, "supplied transactions cannot be committed to");
            return VerificationResult::reject(RejectReason::MalformedInput);
        }
    };
    match set.root(bundle.time_bucket) {
        Ok(root) if root == msg.root => {}
        Ok(_) => return VerificationResult::reject(RejectReason::InvalidRoot),
        Err(e) => {
            debug!(error = %e, "root recomputation failed");
            return VerificationResult::reject(RejectReason::MalformedInput);
        }
    }

    if !predicate_holds(msg.value_cents, &msg.predicate, &set) {
        return VerificationResult::reject(RejectReason::PredicateUnsatisfied);
    }

    VerificationResult::accept()
}

fn check_signed_fields(msg: &AttestationMessage) -> Result<(), &'static str> {
    if msg.schema != SCHEMA_ID {
        return Err("unknown schema");
    }
    if msg.aud != AUDIENCE {
        return Err("wrong audience");
    }
    if msg.expires_at <= msg.issued_at {
        return Err("validity window is empty");
    }
    Ok(())
}

fn predicate_holds(value_cents: u64, predicate: &str, set: &CommittedSet) -> bool {
    let Some(predicate) = Predicate::parse(predicate) else {
        return false;
    };
    predicate.category == set.category()
        && i64::try_from(value_cents).ok() == Some(set.total_minor_units())
        && predicate.is_satisfied_by(value_cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::message::Nonce;
    use crate::commitment::TimeBucket;
    use crate::attestation::typed_data::TypedData;
    use crate::config::{TIME_BUCKET_SECS, VALIDITY_WINDOW_SECS};
    use crate::crypto::keys::SignerKeypair;

    const NOW: u64 = 1_704_067_200;

    fn sample() -> Vec<TransactionRecord> {
        vec![
            TransactionRecord::new("1", 12.34, vec!["Food".into()], "2024-01-01".parse().unwrap()),
            TransactionRecord::new("2", 7.66, vec!["Food".into()], "2024-01-02".parse().unwrap()),
        ]
    }

    fn sign(keypair: &SignerKeypair, message: AttestationMessage) -> ProofBundle {
        let typed = TypedData::new(message);
        let signature = keypair.sign_digest(&typed.digest()).unwrap();
        let message = typed.into_message();
        ProofBundle {
            time_bucket: message.time_bucket(),
            message,
            signature,
            signer: keypair.address(),
        }
    }

    fn bundle_with(keypair: &SignerKeypair, threshold: u64) -> ProofBundle {
        let set = CommittedSet::select(&sample(), "Food").unwrap();
        let message = AttestationMessage::assemble(&set, threshold, NOW, Nonce::from_bytes([7; 32])).unwrap();
        sign(keypair, message)
    }

    #[test]
    fn accepts_reference_scenario() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let result = verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), NOW + 1);
        assert_eq!(result, VerificationResult::accept());
    }

    #[test]
    fn accepts_without_data_on_signature_and_expiry_alone() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        assert!(verify_at(&bundle, &key.address(), None, None, NOW).accepted);
        assert!(verify_at(&bundle, &key.address(), Some(&sample()), None, NOW).accepted);
        assert!(verify_at(&bundle, &key.address(), None, Some("Food"), NOW).accepted);
    }

    #[test]
    fn wrong_identity_is_bad_signature() {
        let key = SignerKeypair::generate();
        let other = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let result = verify_at(&bundle, &other.address(), None, None, NOW);
        assert_eq!(result.reason, Some(RejectReason::BadSignature));
    }

    #[test]
    fn edited_message_is_bad_signature() {
        let key = SignerKeypair::generate();
        let mut bundle = bundle_with(&key, 1000);
        bundle.message.value_cents += 1;
        let result = verify_at(&bundle, &key.address(), None, None, NOW);
        assert_eq!(result.reason, Some(RejectReason::BadSignature));
    }

    #[test]
    fn invalid_recovery_id_is_bad_signature() {
        let key = SignerKeypair::generate();
        let mut bundle = bundle_with(&key, 1000);
        let mut bytes = *bundle.signature.as_bytes();
        bytes[64] = 5;
        bundle.signature = crate::crypto::signatures::RecoverableSignature::from_bytes(bytes);
        let result = verify_at(&bundle, &key.address(), None, None, NOW);
        assert_eq!(result.reason, Some(RejectReason::BadSignature));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let expires = NOW + VALIDITY_WINDOW_SECS;
        assert!(verify_at(&bundle, &key.address(), None, None, expires - 1).accepted);
        assert_eq!(
            verify_at(&bundle, &key.address(), None, None, expires).reason,
            Some(RejectReason::Expired)
        );
    }

    #[test]
    fn expired_wins_over_invalid_root() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let mut tampered = sample();
        tampered[0].amount = 99.0;
        let result = verify_at(
            &bundle,
            &key.address(),
            Some(&tampered),
            Some("Food"),
            NOW + VALIDITY_WINDOW_SECS,
        );
        assert_eq!(result.reason, Some(RejectReason::Expired));
    }

    #[test]
    fn tampered_amount_is_invalid_root() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let mut tampered = sample();
        tampered[1].amount = 7.67;
        let result = verify_at(&bundle, &key.address(), Some(&tampered), Some("Food"), NOW);
        assert_eq!(result.reason, Some(RejectReason::InvalidRoot));
    }

    #[test]
    fn wrong_category_is_invalid_root() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let result = verify_at(&bundle, &key.address(), Some(&sample()), Some("Travel"), NOW);
        assert_eq!(result.reason, Some(RejectReason::InvalidRoot));
    }

    #[test]
    fn verification_hours_later_still_matches_root() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let later = NOW + 30 * TIME_BUCKET_SECS;
        assert!(verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), later).accepted);
    }

    #[test]
    fn bucket_not_matching_issued_at_is_malformed_when_recomputing() {
        let key = SignerKeypair::generate();
        let mut bundle = bundle_with(&key, 1000);
        bundle.time_bucket = TimeBucket(bundle.time_bucket.0 + 1);
        let result = verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), NOW);
        assert_eq!(result.reason, Some(RejectReason::MalformedInput));
        // The bucket is unsigned metadata; without data nothing depends on it.
        assert!(verify_at(&bundle, &key.address(), None, None, NOW).accepted);
    }

    #[test]
    fn edited_signed_fields_are_bad_signature() {
        let key = SignerKeypair::generate();
        let edits: [fn(&mut AttestationMessage); 4] = [
            |m| m.issued_at += 600,
            |m| m.schema = "other.schema".into(),
            |m| m.aud = "someone-else".into(),
            |m| m.expires_at = m.issued_at,
        ];
        for edit in edits {
            let mut bundle = bundle_with(&key, 1000);
            edit(&mut bundle.message);
            let result = verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), NOW);
            assert_eq!(result.reason, Some(RejectReason::BadSignature));
        }
    }

    #[test]
    fn forged_signature_with_empty_category_is_bad_signature() {
        let key = SignerKeypair::generate();
        let mut bundle = bundle_with(&key, 1000);
        let mut bytes = *bundle.signature.as_bytes();
        bytes[10] ^= 0x01;
        bundle.signature = crate::crypto::signatures::RecoverableSignature::from_bytes(bytes);
        let result = verify_at(&bundle, &key.address(), Some(&sample()), Some(""), NOW);
        assert_eq!(result.reason, Some(RejectReason::BadSignature));
    }

    #[test]
    fn signed_foreign_audience_is_malformed() {
        let key = SignerKeypair::generate();
        let set = CommittedSet::select(&sample(), "Food").unwrap();
        let mut message = AttestationMessage::assemble(&set, 1000, NOW, Nonce::from_bytes([4; 32])).unwrap();
        message.aud = "someone-else".into();
        let bundle = sign(&key, message);
        let result = verify_at(&bundle, &key.address(), None, None, NOW);
        assert_eq!(result.reason, Some(RejectReason::MalformedInput));
    }

    #[test]
    fn signed_empty_validity_window_is_malformed() {
        let key = SignerKeypair::generate();
        let set = CommittedSet::select(&sample(), "Food").unwrap();
        let mut message = AttestationMessage::assemble(&set, 1000, NOW, Nonce::from_bytes([5; 32])).unwrap();
        message.expires_at = message.issued_at;
        let bundle = sign(&key, message);
        let result = verify_at(&bundle, &key.address(), None, None, NOW);
        assert_eq!(result.reason, Some(RejectReason::MalformedInput));
    }

    #[test]
    fn empty_category_is_malformed() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let result = verify_at(&bundle, &key.address(), Some(&sample()), Some(""), NOW);
        assert_eq!(result.reason, Some(RejectReason::MalformedInput));
    }

    #[test]
    fn non_finite_supplied_amount_is_malformed() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let mut bad = sample();
        bad[0].amount = f64::NAN;
        let result = verify_at(&bundle, &key.address(), Some(&bad), Some("Food"), NOW);
        assert_eq!(result.reason, Some(RejectReason::MalformedInput));
    }

    #[test]
    fn foreign_schema_is_malformed_even_if_signed() {
        let key = SignerKeypair::generate();
        let set = CommittedSet::select(&sample(), "Food").unwrap();
        let mut message = AttestationMessage::assemble(&set, 1000, NOW, Nonce::from_bytes([1; 32])).unwrap();
        message.schema = "other.schema".into();
        let bundle = sign(&key, message);
        let result = verify_at(&bundle, &key.address(), None, None, NOW);
        assert_eq!(result.reason, Some(RejectReason::MalformedInput));
    }

    #[test]
    fn signed_false_predicate_is_unsatisfied() {
        // A signer that attests to a threshold above the total it commits to.
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 5000);
        assert!(verify_at(&bundle, &key.address(), None, None, NOW).accepted);
        let result = verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), NOW);
        assert_eq!(result.reason, Some(RejectReason::PredicateUnsatisfied));
    }

    #[test]
    fn signed_value_not_matching_data_is_unsatisfied() {
        let key = SignerKeypair::generate();
        let set = CommittedSet::select(&sample(), "Food").unwrap();
        let mut message = AttestationMessage::assemble(&set, 1000, NOW, Nonce::from_bytes([2; 32])).unwrap();
        message.value_cents = 999_999;
        let bundle = sign(&key, message);
        let result = verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), NOW);
        assert_eq!(result.reason, Some(RejectReason::PredicateUnsatisfied));
    }

    #[test]
    fn verification_is_repeatable() {
        let key = SignerKeypair::generate();
        let bundle = bundle_with(&key, 1000);
        let first = verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), NOW);
        let second = verify_at(&bundle, &key.address(), Some(&sample()), Some("Food"), NOW);
        assert_eq!(first, second);
    }

    #[test]
    fn result_json_uses_snake_case_codes() {
        let json = serde_json::to_value(VerificationResult::reject(RejectReason::InvalidRoot)).unwrap();
        assert_eq!(json, serde_json::json!({ "accepted": false, "reason": "invalid_root" }));
        let json = serde_json::to_value(VerificationResult::accept()).unwrap();
        assert_eq!(json, serde_json::json!({ "accepted": true }));
        for reason in RejectReason::ALL {
            assert_eq!(serde_json::to_value(reason).unwrap(), reason.as_str());
        }
    }
}
