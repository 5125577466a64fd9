//! Integer minor-unit money.
//!
//! Amounts are stored as whole francs (XAF has no subunit). The display
//! string is derived from the amount; nothing in the system parses a display
//! string back into a number.

use serde::{Deserialize, Serialize};

pub const CURRENCY_CODE: &str = "XAF";
pub const CURRENCY_SUFFIX: &str = "FCFA";

/// An amount of money in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Multiply by a quantity. Saturates instead of wrapping; prices and
    /// quantities in this system are nowhere near i64 range.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Storefront display string, e.g. `14,000 FCFA`.
    #[must_use]
    pub fn display(self) -> String {
        format!("{} {CURRENCY_SUFFIX}", group_thousands(self.0))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

fn group_thousands(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::from_minor(9_900).display(), "9,900 FCFA");
        assert_eq!(Money::from_minor(14_000).display(), "14,000 FCFA");
        assert_eq!(Money::from_minor(1_234_567).display(), "1,234,567 FCFA");
        assert_eq!(Money::from_minor(500).display(), "500 FCFA");
        assert_eq!(Money::from_minor(0).display(), "0 FCFA");
    }

    #[test]
    fn times_scales_the_amount() {
        assert_eq!(Money::from_minor(9_900).times(3).minor(), 29_700);
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&Money::from_minor(9_900)).expect("serialize");
        assert_eq!(json, "9900");
    }
}
