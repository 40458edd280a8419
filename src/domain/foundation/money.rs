//! Money value object.
//!
//! Amounts are decimal, single-currency and rounded half away from zero
//! to two places whenever a derived value is produced.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Currency of a transaction. Conversion between currencies is never performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "EUR", alias = "eur")]
    Eur,
}

impl Currency {
    /// ISO-4217 code, upper case.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
        }
    }

    /// Lower-case code as expected by the checkout provider.
    pub fn provider_code(&self) -> &'static str {
        match self {
            Currency::Eur => "eur",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A monetary amount in the transaction currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Largest amount a single checkout may charge (999 999.99).
    pub const MAX_CHARGE: Money = Money(Decimal::from_parts(99_999_999, 0, 0, false, 2));

    /// Wraps a decimal amount without rounding.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Builds an amount from a float, as read from configuration.
    pub fn from_f64(field: &str, amount: f64) -> Result<Self, ValidationError> {
        Decimal::from_f64(amount)
            .map(Self)
            .ok_or_else(|| ValidationError::invalid_format(field, "not a finite number"))
    }

    /// Whole currency units, usable in constants.
    pub const fn from_whole(units: u32) -> Self {
        Self(Decimal::from_parts(units, 0, 0, false, 0))
    }

    /// Builds an amount from integer minor units (cents).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Returns the inner decimal.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Rounds to two decimals, half away from zero (12.345 → 12.35).
    pub fn round2(&self) -> Self {
        Self(round2(self.0))
    }

    /// Amount in minor units (cents), after rounding.
    ///
    /// Fails when the cent count does not fit in an `i64`.
    pub fn to_cents(&self) -> Result<i64, ValidationError> {
        round2(self.0)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .ok_or_else(|| ValidationError::out_of_range("amount", i64::MAX))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns this amount, or zero when negative.
    pub fn clamp_non_negative(&self) -> Self {
        if self.0.is_sign_negative() {
            Self::ZERO
        } else {
            *self
        }
    }

    /// Rejects zero and negative amounts.
    pub fn ensure_positive(self, field: &str) -> Result<Self, ValidationError> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(ValidationError::not_positive(field))
        }
    }

    /// Rejects amounts a checkout session cannot charge: zero, negative
    /// or above [`Money::MAX_CHARGE`].
    pub fn ensure_chargeable(self, field: &str) -> Result<Self, ValidationError> {
        let amount = self.ensure_positive(field)?;
        if amount.round2() > Self::MAX_CHARGE {
            return Err(ValidationError::out_of_range(field, Self::MAX_CHARGE));
        }
        Ok(amount)
    }
}

/// Two-decimal half-up rounding shared by all money computations.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", round2(self.0))
    }
}
