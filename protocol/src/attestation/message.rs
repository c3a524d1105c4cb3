//! # Attestation Message
//!
//! The structured statement a wallet signs:
//!
//! ```text
//! schema      "plaid.sum.v1"
//! aud         "privy-plaid-demo"
//! nonce       32 random bytes, fresh per attestation
//! issuedAt    unix seconds
//! expiresAt   issuedAt + 86400
//! plaidRoot   commitment root over the category's transactions
//! valueCents  exact category total in minor units
//! predicate   "sum(<category>) >= <threshold>"
//! ```
//!
//! The message is immutable once built. The JSON form renders the integer
//! fields as decimal strings, matching what wallets and browsers exchange
//! (JavaScript numbers cannot hold a full `uint64`); numbers are accepted
//! too when reading.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use super::error::AttestationError;
use super::predicate::Predicate;
use crate::commitment::{CommittedSet, Root, TimeBucket};
use crate::config::{AUDIENCE, NONCE_LENGTH, SCHEMA_ID, VALIDITY_WINDOW_SECS};
use crate::transaction::TransactionRecord;

// ---------------------------------------------------------------------------
// Nonce
// ---------------------------------------------------------------------------

/// A 32-byte random nonce. Two attestations never share one.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LENGTH]);

impl Nonce {
    /// Draw a fresh nonce from the OS random source.
    pub fn random() -> Result<Self, AttestationError> {
        let mut bytes = [0u8; NONCE_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AttestationError::RandomSource(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; NONCE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", self.to_hex())
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        let raw = hex::decode(digits).map_err(serde::de::Error::custom)?;
        let bytes: [u8; NONCE_LENGTH] = raw
            .try_into()
            .map_err(|_| serde::de::Error::custom("nonce must be 32 bytes"))?;
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// AttestationMessage
// ---------------------------------------------------------------------------

/// The signed statement. Field order mirrors the typed-data schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationMessage {
    pub schema: String,
    pub aud: String,
    pub nonce: Nonce,
    #[serde(with = "decimal_string")]
    pub issued_at: u64,
    #[serde(with = "decimal_string")]
    pub expires_at: u64,
    #[serde(rename = "plaidRoot")]
    pub root: Root,
    #[serde(with = "decimal_string")]
    pub value_cents: u64,
    pub predicate: String,
}

impl AttestationMessage {
    /// Assemble a message from an already-selected transaction set.
    ///
    /// # Errors
    ///
    /// [`AttestationError::MalformedInput`] when the category nets out
    /// negative, since `valueCents` is unsigned.
    pub fn assemble(
        set: &CommittedSet,
        threshold_minor_units: u64,
        now: u64,
        nonce: Nonce,
    ) -> Result<Self, AttestationError> {
        let root = set.root(TimeBucket::at(now))?;
        let value_cents = u64::try_from(set.total_minor_units()).map_err(|_| {
            AttestationError::MalformedInput(format!(
                "category {} nets to {} minor units; attested values must be non-negative",
                set.category(),
                set.total_minor_units()
            ))
        })?;
        let expires_at = now.checked_add(VALIDITY_WINDOW_SECS).ok_or_else(|| {
            AttestationError::MalformedInput(format!("issuance time {} overflows", now))
        })?;

        Ok(Self {
            schema: SCHEMA_ID.to_string(),
            aud: AUDIENCE.to_string(),
            nonce,
            issued_at: now,
            expires_at,
            root,
            value_cents,
            predicate: Predicate::new(set.category(), threshold_minor_units).to_string(),
        })
    }

    /// The bucket the root was derived in.
    pub fn time_bucket(&self) -> TimeBucket {
        TimeBucket::at(self.issued_at)
    }

    /// Whether the message is past its validity window at `now`.
    /// The boundary second itself counts as expired.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Build an unsigned attestation for `category` over `transactions`.
///
/// `threshold_minor_units` only shapes the predicate string; whether the
/// total actually reaches it is the caller's decision (see
/// [`super::proof::generate_proof`], which refuses when it does not).
/// An empty selection yields a well-formed message with `valueCents = 0`.
///
/// # Errors
///
/// [`AttestationError::MalformedInput`] for an empty category, invalid
/// records, or a negative total; [`AttestationError::RandomSource`] if no
/// nonce could be drawn.
pub fn build_attestation(
    transactions: &[TransactionRecord],
    category: &str,
    threshold_minor_units: u64,
    now: u64,
) -> Result<AttestationMessage, AttestationError> {
    let set = CommittedSet::select(transactions, category)?;
    let message = AttestationMessage::assemble(&set, threshold_minor_units, now, Nonce::random()?)?;
    info!(
        category,
        entries = set.entries().len(),
        value_cents = message.value_cents,
        expires_at = message.expires_at,
        "built attestation"
    );
    Ok(message)
}

/// Serde adapter: `u64` as a decimal string, accepting numbers on input.
mod decimal_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
