//! Transaction records as supplied by the bank-data connector.
//!
//! The connector owns fetching, paging and de-duplication. By the time a
//! record reaches this crate it is read-only input: we validate it, project
//! the fields the commitment cares about, and ignore the rest.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::config::MINOR_UNITS_PER_UNIT;

/// Reasons a transaction record is unusable.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("transaction has an empty id")]
    EmptyId,

    #[error("transaction {id}: amount {amount} is not finite")]
    NonFiniteAmount { id: String, amount: f64 },

    #[error("transaction {id}: amount {amount} does not fit in minor units")]
    AmountOutOfRange { id: String, amount: f64 },

    #[error("transaction {id}: category label at position {index} is empty")]
    EmptyCategoryLabel { id: String, index: usize },
}

/// A single bank transaction.
///
/// `amount` is in the display currency unit (dollars), positive for money
/// leaving the account. `category` is ordered, most general label first.
/// Only `id`, `amount`, `category` and `date` contribute to commitments;
/// the descriptive fields can change without invalidating an attestation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Stable identifier assigned by the connector. Integer ids are read
    /// as their decimal text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Signed amount in display units.
    pub amount: f64,
    /// Category labels, primary first. May be empty.
    #[serde(default)]
    pub category: Vec<String>,
    /// Posting date.
    pub date: NaiveDate,
    /// Raw transaction name as reported by the bank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cleaned-up merchant name, when the bank supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_currency_code: Option<String>,
    #[serde(default)]
    pub pending: bool,
}

impl TransactionRecord {
    /// Minimal constructor; descriptive fields start empty.
    pub fn new(
        id: impl Into<String>,
        amount: f64,
        category: Vec<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            category,
            date,
            name: None,
            merchant_name: None,
            account_id: None,
            iso_currency_code: None,
            pending: false,
        }
    }

    /// Check the record invariants: non-empty id, finite amount that fits
    /// in minor units, and no empty category labels.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.id.is_empty() {
            return Err(RecordError::EmptyId);
        }
        self.amount_minor_units()?;
        if let Some(index) = self.category.iter().position(|label| label.is_empty()) {
            return Err(RecordError::EmptyCategoryLabel {
                id: self.id.clone(),
                index,
            });
        }
        Ok(())
    }

    /// Whether `category` appears among this record's labels. Exact,
    /// case-sensitive match on the label as stored.
    pub fn has_category(&self, category: &str) -> bool {
        self.category.iter().any(|label| label == category)
    }

    /// Primary (first) category label, if any.
    pub fn primary_category(&self) -> Option<&str> {
        self.category.first().map(String::as_str)
    }

    /// Amount converted to integer minor units.
    ///
    /// Rounds once, half away from zero, on the original amount. Note that
    /// `12.34 * 100.0` is `1233.9999...` in binary floating point; rounding
    /// brings it back to `1234`.
    pub fn amount_minor_units(&self) -> Result<i64, RecordError> {
        to_minor_units(self.amount).ok_or_else(|| {
            if self.amount.is_finite() {
                RecordError::AmountOutOfRange {
                    id: self.id.clone(),
                    amount: self.amount,
                }
            } else {
                RecordError::NonFiniteAmount {
                    id: self.id.clone(),
                    amount: self.amount,
                }
            }
        })
    }
}

/// Convert a display-unit amount to minor units, or `None` when the amount
/// is not finite or overflows `i64`.
pub fn to_minor_units(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    let scaled = (amount * MINOR_UNITS_PER_UNIT as f64).round();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if scaled >= i64::MIN as f64 && scaled < i64::MAX as f64 {
        Some(scaled as i64)
    } else {
        None
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(u64),
        Signed(i64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Signed(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn record(amount: f64) -> TransactionRecord {
        TransactionRecord::new("tx-1", amount, vec!["Food".into()], date("2024-01-01"))
    }

    #[test]
    fn minor_units_round_half_away_from_zero() {
        assert_eq!(to_minor_units(12.34), Some(1234));
        assert_eq!(to_minor_units(7.66), Some(766));
        assert_eq!(to_minor_units(0.005), Some(1));
        assert_eq!(to_minor_units(-0.005), Some(-1));
        assert_eq!(to_minor_units(-7.66), Some(-766));
    }

    #[test]
    fn non_finite_amounts_rejected() {
        assert_eq!(to_minor_units(f64::NAN), None);
        assert_eq!(to_minor_units(f64::INFINITY), None);
        assert!(matches!(
            record(f64::NAN).validate(),
            Err(RecordError::NonFiniteAmount { .. })
        ));
    }

    #[test]
    fn huge_amounts_rejected() {
        assert!(matches!(
            record(1e300).validate(),
            Err(RecordError::AmountOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_label_rejected() {
        let mut tx = record(1.0);
        tx.category.push(String::new());
        assert_eq!(
            tx.validate(),
            Err(RecordError::EmptyCategoryLabel {
                id: "tx-1".into(),
                index: 1
            })
        );
    }

    #[test]
    fn empty_id_rejected() {
        let mut tx = record(1.0);
        tx.id.clear();
        assert_eq!(tx.validate(), Err(RecordError::EmptyId));
    }

    #[test]
    fn category_match_is_case_sensitive() {
        let tx = TransactionRecord::new(
            "1",
            1.0,
            vec!["Food and Drink".into(), "Restaurants".into()],
            date("2024-01-01"),
        );
        assert!(tx.has_category("Restaurants"));
        assert!(!tx.has_category("restaurants"));
        assert!(!tx.has_category("Food"));
        assert_eq!(tx.primary_category(), Some("Food and Drink"));
    }

    #[test]
    fn deserializes_connector_json() {
        let json = r#"{
            "id": "abc",
            "amount": 12.5,
            "category": ["Travel", "Taxi"],
            "date": "2024-03-05",
            "merchantName": "Uber",
            "pending": true
        }"#;
        let tx: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, "abc");
        assert_eq!(tx.date, date("2024-03-05"));
        assert_eq!(tx.merchant_name.as_deref(), Some("Uber"));
        assert!(tx.pending);
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn missing_category_defaults_to_empty() {
        let json = r#"{"id": "x", "amount": 1.0, "date": "2024-01-01"}"#;
        let tx: TransactionRecord = serde_json::from_str(json).unwrap();
        assert!(tx.category.is_empty());
        assert_eq!(tx.primary_category(), None);
    }

    #[test]
    fn integer_ids_read_as_text() {
        let json = r#"{"id": 1, "amount": 12.34, "category": ["Food"], "date": "2024-01-01"}"#;
        let tx: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, "1");
        assert!(serde_json::from_str::<TransactionRecord>(
            r#"{"id": 1.5, "amount": 1.0, "date": "2024-01-01"}"#
        )
        .is_err());
    }
}
