//! # Commitment Derivation
//!
//! Maps a transaction set to a 32-byte root that binds *which* transactions
//! back an attested total. The derivation is a pure function of:
//!
//! ```text
//! category
//! sorted [ {id, amount (minor units), category labels, date} ]   (matching records only)
//! time bucket = floor(unix_seconds / 600)
//! ```
//!
//! serialized as compact JSON with a fixed field order and hashed with
//! Keccak-256. Descriptive fields (name, merchant, account) are not part of
//! the pre-image, so they can be edited without breaking an attestation.
//!
//! ## The time bucket
//!
//! Folding a 10-minute bucket into the root means the same data hashes to a
//! different root once the bucket rolls over. A verifier recomputing with
//! its own wall clock would reject perfectly good attestations. We carry
//! the generator's bucket explicitly (see `attestation::proof`) and have
//! verifiers recompute in *that* bucket.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::config::{ROOT_LENGTH, TIME_BUCKET_SECS};
use crate::crypto::hash::keccak256;
use crate::transaction::{RecordError, TransactionRecord};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while deriving a commitment.
#[derive(Debug, Error)]
pub enum CommitmentError {
    #[error("category must not be empty")]
    EmptyCategory,

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("category total overflows")]
    Overflow,

    #[error("canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

/// A 32-byte commitment root.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Root([u8; ROOT_LENGTH]);

impl Root {
    pub fn from_bytes(bytes: [u8; ROOT_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ROOT_LENGTH] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse `0x`-prefixed or bare hex of exactly 32 bytes.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits).ok()?;
        let bytes: [u8; ROOT_LENGTH] = raw.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root({})", self.to_hex())
    }
}

impl Serialize for Root {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Root {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| serde::de::Error::custom("root must be 32 hex bytes"))
    }
}

// ---------------------------------------------------------------------------
// Time bucket
// ---------------------------------------------------------------------------

/// A coarse, 10-minute slice of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeBucket(pub u64);

impl TimeBucket {
    /// The bucket containing `unix_seconds`.
    pub fn at(unix_seconds: u64) -> Self {
        Self(unix_seconds / TIME_BUCKET_SECS)
    }
}

// ---------------------------------------------------------------------------
// Commitment input
// ---------------------------------------------------------------------------

/// One transaction as it enters the commitment pre-image.
///
/// Field order is part of the canonical encoding. Do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitmentEntry {
    pub id: String,
    /// Minor units, rounded once from the display amount.
    pub amount: i64,
    pub category: Vec<String>,
    pub date: NaiveDate,
}

impl CommitmentEntry {
    /// Date, then id. The remaining fields break ties so that entries which
    /// compare equal are identical and input order cannot reach the root.
    fn canonical_order(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.amount.cmp(&other.amount))
            .then_with(|| self.category.cmp(&other.category))
    }
}

/// The filtered, projected, sorted subset of a transaction set for one
/// category, together with its exact minor-unit total.
///
/// Both the root and the attested value come from this one structure, so
/// they cannot disagree about which transactions were counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedSet {
    category: String,
    entries: Vec<CommitmentEntry>,
    total_minor_units: i64,
}

#[derive(Serialize)]
struct Preimage<'a> {
    category: &'a str,
    transactions: &'a [CommitmentEntry],
    timestamp: u64,
}

impl CommittedSet {
    /// Select the records labelled with `category` and project them.
    ///
    /// # Errors
    ///
    /// [`CommitmentError::EmptyCategory`] for an empty category, or the first
    /// matching record that fails validation.
    pub fn select(
        transactions: &[TransactionRecord],
        category: &str,
    ) -> Result<Self, CommitmentError> {
        if category.is_empty() {
            return Err(CommitmentError::EmptyCategory);
        }

        let mut entries = Vec::new();
        let mut total: i64 = 0;
        for tx in transactions.iter().filter(|tx| tx.has_category(category)) {
            tx.validate()?;
            let amount = tx.amount_minor_units()?;
            total = total.checked_add(amount).ok_or(CommitmentError::Overflow)?;
            entries.push(CommitmentEntry {
                id: tx.id.clone(),
                amount,
                category: tx.category.clone(),
                date: tx.date,
            });
        }
        entries.sort_by(CommitmentEntry::canonical_order);

        Ok(Self {
            category: category.to_string(),
            entries,
            total_minor_units: total,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn entries(&self) -> &[CommitmentEntry] {
        &self.entries
    }

    /// Exact sum of the entries' minor-unit amounts.
    pub fn total_minor_units(&self) -> i64 {
        self.total_minor_units
    }

    /// Canonical pre-image bytes for the given bucket.
    pub fn canonical_bytes(&self, bucket: TimeBucket) -> Result<Vec<u8>, CommitmentError> {
        let preimage = Preimage {
            category: &self.category,
            transactions: &self.entries,
            timestamp: bucket.0,
        };
        Ok(serde_json::to_vec(&preimage)?)
    }

    /// Root of this set within `bucket`.
    pub fn root(&self, bucket: TimeBucket) -> Result<Root, CommitmentError> {
        let bytes = self.canonical_bytes(bucket)?;
        let root = Root(keccak256(&bytes));
        debug!(
            category = %self.category,
            entries = self.entries.len(),
            bucket = bucket.0,
            root = %root,
            "derived commitment root"
        );
        Ok(root)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Derive the commitment root for `category` at wall-clock time `now`
/// (unix seconds).
pub fn derive_root(
    transactions: &[TransactionRecord],
    category: &str,
    now: u64,
) -> Result<Root, CommitmentError> {
    derive_root_in_bucket(transactions, category, TimeBucket::at(now))
}

/// Derive the commitment root in an explicit time bucket. Verifiers use
/// this with the bucket carried alongside the attestation.
pub fn derive_root_in_bucket(
    transactions: &[TransactionRecord],
    category: &str,
    bucket: TimeBucket,
) -> Result<Root, CommitmentError> {
    CommittedSet::select(transactions, category)?.root(bucket)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
