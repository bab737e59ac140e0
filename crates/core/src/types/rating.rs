//! Star rating attached to a customer review.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating must be a whole number")]
    NotANumber,
    #[error("rating must be between {min} and {max} (got {got})")]
    OutOfRange { min: u8, max: u8, got: i64 },
}

/// A review rating from 1 to 5 stars.
///
/// ```
/// use boxsub_core::Rating;
///
/// assert_eq!(Rating::default().value(), 5);
/// assert!(Rating::new(0).is_err());
/// assert!(Rating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` unless `1 <= value <= 5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        match u8::try_from(value) {
            Ok(v) if (Self::MIN..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(RatingError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                got: value,
            }),
        }
    }

    /// Parse a rating from form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an integer in range.
    pub fn parse(s: &str) -> Result<Self, RatingError> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| RatingError::NotANumber)?;
        Self::new(value)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Filled and empty star counts for display.
    #[must_use]
    pub const fn stars(self) -> (u8, u8) {
        (self.0, Self::MAX - self.0)
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        for v in 1..=5 {
            assert_eq!(i64::from(Rating::new(v).unwrap()), v);
        }
        assert!(matches!(
            Rating::new(0),
            Err(RatingError::OutOfRange { got: 0, .. })
        ));
        assert!(Rating::new(-3).is_err());
        assert!(Rating::new(300).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Rating::parse(" 4 ").unwrap().value(), 4);
        assert_eq!(Rating::parse("four"), Err(RatingError::NotANumber));
        assert!(Rating::parse("4.5").is_err());
    }

    #[test]
    fn test_stars() {
        assert_eq!(Rating::new(3).unwrap().stars(), (3, 2));
        assert_eq!(Rating::default().stars(), (5, 0));
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let rating: Rating = serde_json::from_str("2").unwrap();
        assert_eq!(rating.value(), 2);
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }
}
