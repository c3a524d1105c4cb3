//! The human-readable predicate carried in every attestation.
//!
//! Format: `sum(<category>) >= <threshold>`, with the threshold written in
//! display units the way a person would type it (`10`, `10.5`, `10.05`).
//! Internally the threshold is held in minor units.

use std::fmt;

use crate::config::MINOR_UNITS_PER_UNIT;

/// A parsed `sum(category) >= threshold` assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub category: String,
    pub threshold_minor_units: u64,
}

impl Predicate {
    pub fn new(category: impl Into<String>, threshold_minor_units: u64) -> Self {
        Self {
            category: category.into(),
            threshold_minor_units,
        }
    }

    /// Parse a predicate string. Only the exact form [`Display`] produces
    /// is accepted: plain digits, at most two decimals, no trailing zeros
    /// after the point, no leading zeros, no signs or exponents.
    ///
    /// [`Display`]: fmt::Display
    pub fn parse(s: &str) -> Option<Self> {
        let inner = s.strip_prefix("sum(")?;
        // Category labels may themselves contain ") >= ", so split on the last one.
        let (category, threshold) = inner.rsplit_once(") >= ")?;
        if category.is_empty() {
            return None;
        }
        let predicate = Self::new(category, parse_display_units(threshold)?);
        (predicate.to_string() == s).then_some(predicate)
    }

    /// Whether `value_minor_units` satisfies the predicate.
    pub fn is_satisfied_by(&self, value_minor_units: u64) -> bool {
        value_minor_units >= self.threshold_minor_units
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sum({}) >= ", self.category)?;
        let whole = self.threshold_minor_units / 100;
        let frac = self.threshold_minor_units % 100;
        match frac {
            0 => write!(f, "{}", whole),
            f10 if f10 % 10 == 0 => write!(f, "{}.{}", whole, f10 / 10),
            _ => write!(f, "{}.{:02}", whole, frac),
        }
    }
}

/// `123`, `123.4` or `123.45` to minor units. Digits only.
fn parse_display_units(text: &str) -> Option<u64> {
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text, ""),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || (text.contains('.') && (!all_digits(frac) || frac.len() > 2)) {
        return None;
    }
    let cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<u64>().ok()? * 10,
        _ => frac.parse::<u64>().ok()?,
    };
    whole
        .parse::<u64>()
        .ok()?
        .checked_mul(MINOR_UNITS_PER_UNIT as u64)?
        .checked_add(cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_whole_thresholds_without_decimals() {
        assert_eq!(Predicate::new("Food", 1000).to_string(), "sum(Food) >= 10");
        assert_eq!(Predicate::new("Food", 0).to_string(), "sum(Food) >= 0");
    }

    #[test]
    fn renders_fractional_thresholds_minimally() {
        assert_eq!(Predicate::new("Food", 1050).to_string(), "sum(Food) >= 10.5");
        assert_eq!(Predicate::new("Food", 1005).to_string(), "sum(Food) >= 10.05");
    }

    #[test]
    fn parses_what_it_renders() {
        for minor in [0, 1, 99, 1000, 1050, 1005, 123_456] {
            let p = Predicate::new("Food and Drink", minor);
            assert_eq!(Predicate::parse(&p.to_string()), Some(p));
        }
    }

    #[test]
    fn category_may_contain_parentheses() {
        let p = Predicate::parse("sum(Shops (Online)) >= 25").unwrap();
        assert_eq!(p.category, "Shops (Online)");
        assert_eq!(p.threshold_minor_units, 2500);
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(Predicate::parse("sum(Food) > 10"), None);
        assert_eq!(Predicate::parse("avg(Food) >= 10"), None);
        assert_eq!(Predicate::parse("sum() >= 10"), None);
        assert_eq!(Predicate::parse("sum(Food) >= -1"), None);
        assert_eq!(Predicate::parse("sum(Food) >= ten"), None);
    }

    #[test]
    fn rejects_thresholds_it_would_never_render() {
        for text in ["10.005", "1e1", "10.50", "010", "+10", "10.", ".5", " 10", "10.0"] {
            let s = format!("sum(Food) >= {}", text);
            assert_eq!(Predicate::parse(&s), None, "{}", s);
        }
        assert_eq!(
            Predicate::parse("sum(Food) >= 10.05"),
            Some(Predicate::new("Food", 1005))
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        let p = Predicate::new("Food", 2000);
        assert!(p.is_satisfied_by(2000));
        assert!(p.is_satisfied_by(2001));
        assert!(!p.is_satisfied_by(1999));
    }
}
