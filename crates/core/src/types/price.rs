//! Type-safe price representation using decimal arithmetic.
//!
//! Book prices and order totals are always [`Decimal`], never floats, so that
//! `2 x 10.00 + 1 x 5.50` is exactly `25.50`.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The amount does not fit the stored `NUMERIC(10,2)` column.
    #[error("price cannot exceed {max} (got {0})", max = Price::MAX.0)]
    TooLarge(Decimal),
}

/// A non-negative unit price in the store currency.
///
/// ## Examples
///
/// ```
/// use bookstore_core::{Price, Quantity};
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(1000, 2)).unwrap(); // 10.00
/// let qty = Quantity::new(2).unwrap();
/// assert_eq!(price.line_total(qty), Some(Decimal::new(2000, 2)));
///
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// assert!(Price::new(Decimal::new(100_000_000, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable price, 99,999,999.99.
    pub const MAX: Self = Self(Decimal::from_parts(1_410_065_407, 2, 0, false, 2));

    /// Create a price, rejecting negative amounts and amounts above [`Price::MAX`].
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount < 0` and
    /// `PriceError::TooLarge` if `amount > Price::MAX`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge(amount));
        }
        Ok(Self(amount))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, or `None` if the product overflows.
    #[must_use]
    pub fn line_total(&self, quantity: Quantity) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity.get()))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_allowed() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::new(-550, 2)),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_line_total_is_exact() {
        let price = Price::new(Decimal::new(550, 2)).unwrap();
        let total = price.line_total(Quantity::new(3).unwrap());
        assert_eq!(total, Some(Decimal::new(1650, 2)));
    }

    #[test]
    fn test_max_matches_column_range() {
        assert_eq!(Price::MAX.amount(), Decimal::new(9_999_999_999, 2));
        assert!(Price::new(Price::MAX.amount()).is_ok());
        assert!(matches!(
            Price::new(Decimal::new(10_000_000_000, 2)),
            Err(PriceError::TooLarge(_))
        ));
        assert!(matches!(
            Price::new(Decimal::new(5, 0) * Decimal::from(10_i64.pow(18))),
            Err(PriceError::TooLarge(_))
        ));
    }

    #[test]
    fn test_line_total_at_max_price_fits() {
        let total = Price::MAX.line_total(Quantity::new(i64::from(i32::MAX)).unwrap());
        assert!(total.is_some());
    }

    #[test]
    fn test_display_two_places() {
        let price = Price::new(Decimal::new(10, 0)).unwrap();
        assert_eq!(price.to_string(), "10.00");
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Price>("\"-1.00\"").is_err());
        assert!(serde_json::from_str::<Price>("\"100000000.00\"").is_err());
        let price: Price = serde_json::from_str("\"12.99\"").unwrap();
        assert_eq!(price.amount(), Decimal::new(1299, 2));
    }
}
