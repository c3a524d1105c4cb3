//! # Transaction Input
//!
//! The read-only transaction data the attestation core works over, and a
//! per-category summary used to pick what to attest to.

pub mod summary;
pub mod types;

pub use summary::{summarize_by_category, CategorySummary};
pub use types::{to_minor_units, RecordError, TransactionRecord};
