//! Money and commission arithmetic using decimal amounts.
//!
//! All cart totals, order amounts and payouts are computed with
//! [`rust_decimal::Decimal`] so repeated additions never accumulate
//! fractional-cent drift. Rounding happens only when an amount is displayed
//! or when a commission is charged.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Platform commission on every completed sale (5%).
pub const COMMISSION_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Number of decimal places used for currency amounts.
const CURRENCY_SCALE: u32 = 2;

/// Round an amount to whole minor units (kobo, cents).
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The platform commission owed on a sale of `amount`.
///
/// ```
/// use cartify_core::commission;
/// use rust_decimal::Decimal;
///
/// assert_eq!(commission(Decimal::new(1999, 2)), Decimal::new(100, 2));
/// ```
#[must_use]
pub fn commission(amount: Decimal) -> Decimal {
    round_currency(amount * COMMISSION_RATE)
}

/// What the seller receives from a sale of `amount` after commission.
#[must_use]
pub fn seller_earnings(amount: Decimal) -> Decimal {
    amount - commission(amount)
}

/// ISO 4217 currency codes accepted by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Nigerian Naira, the marketplace's settlement currency.
    #[default]
    NGN,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::USD => "$",
        }
    }
}

/// An amount of money in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (naira, not kobo).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create an amount in Naira.
    #[must_use]
    pub const fn naira(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::NGN)
    }

    /// A zero amount in Naira.
    #[must_use]
    pub const fn zero() -> Self {
        Self::naira(Decimal::ZERO)
    }

    /// The amount rounded to minor units.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        round_currency(self.amount)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    /// Formats as `₦12,500.00`, with a leading minus for negative amounts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.rounded();
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let plain = format!("{:.2}", rounded.abs());
        let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        write!(
            f,
            "{sign}{}{grouped}.{fraction}",
            self.currency_code.symbol()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_rate_is_five_percent() {
        assert_eq!(COMMISSION_RATE, Decimal::new(5, 2));
    }

    #[test]
    fn test_commission_rounds_half_away_from_zero() {
        // 5% of 10.10 is 0.505
        assert_eq!(commission(Decimal::new(1010, 2)), Decimal::new(51, 2));
        assert_eq!(commission(Decimal::from(20_000)), Decimal::from(1_000));
    }

    #[test]
    fn test_seller_earnings() {
        assert_eq!(seller_earnings(Decimal::from(100)), Decimal::from(95));
        assert_eq!(
            seller_earnings(Decimal::new(1010, 2)),
            Decimal::new(959, 2)
        );
    }

    #[test]
    fn test_display_groups_thousands() {
        let money = Money::naira(Decimal::new(1_234_567_5, 1));
        assert_eq!(money.to_string(), "₦1,234,567.50");
    }

    #[test]
    fn test_display_small_and_negative() {
        assert_eq!(Money::naira(Decimal::new(5, 1)).to_string(), "₦0.50");
        assert_eq!(
            Money::new(Decimal::new(-12_345, 1), CurrencyCode::USD).to_string(),
            "-$1,234.50"
        );
        assert_eq!(Money::zero().to_string(), "₦0.00");
    }
}
