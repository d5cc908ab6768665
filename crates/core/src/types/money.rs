//! Type-safe money representation using decimal arithmetic.
//!
//! Amounts are held as [`Decimal`] and always rounded to the minor-unit
//! precision of their currency (two places for USD, none for JPY). Floating
//! point only appears at the API boundary, where clients send and receive
//! `Float` values.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when building [`Money`] values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The currency code is not one Order Desk prices in.
    #[error("unsupported currency code: {0}")]
    UnsupportedCurrency(String),
    /// A floating point amount was NaN or infinite.
    #[error("amount is not a finite number")]
    NotFinite,
    /// A finite amount too large for decimal arithmetic.
    #[error("amount is out of range")]
    OutOfRange,
}

/// ISO 4217 currency codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
        }
    }

    /// Three letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::JPY => "JPY",
        }
    }

    /// Number of decimal places in the minor unit.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }

    /// Round an amount to this currency's minor unit (half away from zero).
    #[must_use]
    pub fn round(self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.minor_units(), RoundingStrategy::MidpointAwayFromZero)
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "JPY" => Ok(Self::JPY),
            _ => Err(MoneyError::UnsupportedCurrency(s.to_owned())),
        }
    }
}

/// A monetary amount in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount, rounded to the currency precision.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount: currency_code.round(amount),
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }

    /// Convert a client-supplied float into a rounded amount.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::NotFinite`] for NaN or infinite input and
    /// [`MoneyError::OutOfRange`] for values [`Decimal`] cannot hold.
    pub fn from_f64(amount: f64, currency_code: CurrencyCode) -> Result<Self, MoneyError> {
        if !amount.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        let amount = Decimal::from_f64(amount).ok_or(MoneyError::OutOfRange)?;
        Ok(Self::new(amount, currency_code))
    }

    /// Amount as a float for the API boundary.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or_default()
    }

    /// Human readable amount, e.g. `$19.99` or `¥1200`.
    #[must_use]
    pub fn display(&self) -> String {
        let places = self.currency_code.minor_units() as usize;
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            format!("-{}{:.*}", self.currency_code.symbol(), places, self.amount.abs())
        } else {
            format!("{}{:.*}", self.currency_code.symbol(), places, self.amount)
        }
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}
