//! Type-safe price representation using decimal arithmetic.
//!
//! All amounts are Indonesian Rupiah. The backend stores them as `numeric`
//! columns, so they travel over the wire as decimal strings or JSON numbers
//! and are never rounded on the client.

use core::fmt;
use core::ops::Add;
use core::iter::Sum;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input could not be parsed as a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative Rupiah amount.
///
/// ## Examples
///
/// ```
/// use catering_core::Price;
///
/// let unit = Price::from_whole(15_000);
/// assert_eq!(unit.times(2), Price::from_whole(30_000));
/// assert_eq!(unit.times(2).to_string(), "Rp 30.000");
/// assert!(Price::parse("-1").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of Rupiah.
    #[must_use]
    pub fn from_whole(amount: u64) -> Self {
        Self(Decimal::from(amount))
    }

    /// Parse a price from a decimal string such as `"15000"` or `"12500.50"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a decimal or is negative.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line price for `quantity` units of this price.
    ///
    /// Saturates at [`Decimal::MAX`] instead of overflowing.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(
            self.0
                .checked_mul(Decimal::from(quantity))
                .unwrap_or(Decimal::MAX),
        )
    }

    /// Whether this amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    /// Formats as `Rp 1.234.567` (Indonesian grouping), keeping any fraction
    /// after a comma.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let normalized = self.0.normalize();
        let whole = normalized.trunc().abs().to_string();
        let fraction = normalized.fract().abs();

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        if fraction.is_zero() {
            write!(f, "Rp {grouped}")
        } else {
            let digits = fraction.to_string();
            let digits = digits.trim_start_matches("0.");
            write!(f, "Rp {grouped},{digits}")
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

impl Add for Price {
    type Output = Self;

    /// Saturates at [`Decimal::MAX`].
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
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
