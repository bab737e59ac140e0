//! Subscription price using decimal arithmetic.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A subscription price in US dollars.
///
/// Fixture files store prices as JSON numbers; `Decimal` accepts both numbers
/// and numeric strings on input.
///
/// ```
/// use boxsub_core::Price;
/// use rust_decimal::Decimal;
///
/// assert_eq!(Price::new(Decimal::new(2999, 2)).to_string(), "$29.99");
/// assert_eq!(Price::new(Decimal::new(15, 0)).to_string(), "$15.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "${rounded:.2}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_to_cents() {
        assert_eq!(Price::new(Decimal::new(19_995, 3)).to_string(), "$20.00");
        assert_eq!(Price::new(Decimal::new(49, 0)).to_string(), "$49.00");
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Price = serde_json::from_str("29.99").unwrap();
        let from_string: Price = serde_json::from_str("\"29.99\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.amount(), Decimal::new(2999, 2));
    }
}
