//! Star rating attached to a comment.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RatingError {
    /// The value is outside `1..=5`.
    #[error("rating must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// The rejected value.
        value: i64,
        /// Smallest accepted value.
        min: u8,
        /// Largest accepted value.
        max: u8,
    },
}

/// A star rating from 1 to 5 inclusive.
///
/// ```
/// use cineteca_core::Rating;
///
/// let rating = Rating::parse(4).unwrap();
/// assert_eq!(rating.stars(), "★★★★☆");
/// assert!(Rating::parse(0).is_err());
/// assert!(Rating::parse(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Validate a raw rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] unless `1 <= value <= 5`.
    pub fn parse(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
    }

    /// The numeric value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Filled stars followed by empty ones, five glyphs in total.
    #[must_use]
    pub fn stars(self) -> String {
        let filled = usize::from(self.0);
        let empty = usize::from(Self::MAX) - filled;
        format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
    }

    /// All valid ratings, lowest first. Used to render the rating picker.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
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
    fn test_parse_bounds() {
        assert!(Rating::parse(1).is_ok());
        assert!(Rating::parse(5).is_ok());
        assert!(matches!(
            Rating::parse(0),
            Err(RatingError::OutOfRange { value: 0, .. })
        ));
        assert!(Rating::parse(6).is_err());
        assert!(Rating::parse(-3).is_err());
        assert!(Rating::parse(261).is_err());
    }

    #[test]
    fn test_stars() {
        assert_eq!(Rating::parse(1).unwrap().stars(), "★☆☆☆☆");
        assert_eq!(Rating::parse(5).unwrap().stars(), "★★★★★");
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let rating: Rating = serde_json::from_str("3").unwrap();
        assert_eq!(rating.get(), 3);
        assert_eq!(serde_json::to_string(&rating).unwrap(), "3");
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn test_all() {
        let values: Vec<u8> = Rating::all().map(Rating::get).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }
}
