//! Per-category spending summary.
//!
//! Groups transactions by their primary category label and totals them in
//! minor units. This is what a user looks at before choosing which
//! category to attest to, so categories with no net spending are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{RecordError, TransactionRecord};
use crate::config::UNCATEGORIZED_LABEL;

/// Aggregate figures for one primary category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    /// Net total in minor units (outflows positive).
    pub total_minor_units: i64,
}

/// Summarize transactions by primary category.
///
/// Records without any label are grouped under `"Uncategorized"`. Only
/// categories with a positive total are returned, ordered by name.
///
/// # Errors
///
/// Returns the first record whose amount cannot be converted to minor units.
pub fn summarize_by_category(
    transactions: &[TransactionRecord],
) -> Result<Vec<CategorySummary>, RecordError> {
    let mut groups: BTreeMap<&str, (usize, i64)> = BTreeMap::new();

    for tx in transactions {
        let minor = tx.amount_minor_units()?;
        let key = tx.primary_category().unwrap_or(UNCATEGORIZED_LABEL);
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(minor);
    }

    Ok(groups
        .into_iter()
        .filter(|(_, (_, total))| *total > 0)
        .map(|(category, (count, total))| CategorySummary {
            category: category.to_string(),
            count,
            total_minor_units: total,
        })
        .collect())
}
