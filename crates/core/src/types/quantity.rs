//! Positive item quantity for cart entries and order lines.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity was zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i64),
    /// Quantity does not fit the stock column.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Largest accepted quantity.
        max: i32,
    },
}

/// A quantity of at least one unit.
///
/// Stock counts are `i32` in the database, so quantities share that ceiling.
///
/// ```
/// use bookstore_core::Quantity;
///
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity, rejecting values below one.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` for `n < 1` and
    /// `QuantityError::TooLarge` for values that overflow `i32`.
    pub fn new(n: i64) -> Result<Self, QuantityError> {
        if n < 1 {
            return Err(QuantityError::NotPositive(n));
        }
        i32::try_from(n)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge { max: i32::MAX })
    }

    /// Get the quantity as `i32`.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Add two quantities, used when repeat adds merge into one cart entry.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooLarge` on overflow.
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(QuantityError::TooLarge { max: i32::MAX })
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(n: i32) -> Result<Self, Self::Error> {
        Self::new(i64::from(n))
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = i64::deserialize(deserializer)?;
        Self::new(n).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_merges() {
        let merged = Quantity::ONE.checked_add(Quantity::new(2).unwrap()).unwrap();
        assert_eq!(merged.get(), 3);
    }

    #[test]
    fn test_checked_add_overflow() {
        let big = Quantity::new(i64::from(i32::MAX)).unwrap();
        assert!(matches!(
            big.checked_add(Quantity::ONE),
            Err(QuantityError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_too_large() {
        assert!(Quantity::new(i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
    }
}
