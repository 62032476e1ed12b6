//! Currency conversion between the view layer and the processor.
//!
//! The processor only accepts integer amounts in the smallest currency unit
//! (cents); the API and the local store use decimal major units.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use service_core::error::AppError;

use crate::services::square::Money;

/// The single currency every order and payment is priced in.
pub const CURRENCY: &str = "USD";

/// Convert a major-unit amount to minor units: `round(major * 100)`.
pub fn to_minor_units(major: Decimal) -> Result<i64, AppError> {
    major
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("amount out of range: {}", major)))
}

/// Convert minor units back to a major-unit amount with two decimal places.
pub fn to_major_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Processor money value for a major-unit amount.
pub fn money(major: Decimal) -> Result<Money, AppError> {
    Ok(Money::new(to_minor_units(major)?))
}

/// Major-unit value of an optional processor money field; absent is zero.
pub fn major_or_zero(money: Option<&Money>) -> Decimal {
    money
        .map(|m| to_major_units(m.amount))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_two_decimal_amounts_exactly() {
        assert_eq!(to_minor_units(dec!(9.99)).unwrap(), 999);
        assert_eq!(to_minor_units(dec!(20.00)).unwrap(), 2000);
        assert_eq!(to_minor_units(dec!(3.5)).unwrap(), 350);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    }

    #[test]
    fn rounds_sub_cent_amounts_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(1.005)).unwrap(), 101);
        assert_eq!(to_minor_units(dec!(1.004)).unwrap(), 100);
        assert_eq!(to_minor_units(dec!(-1.005)).unwrap(), -101);
    }

    #[test]
    fn round_trips_cent_precision_values() {
        for cents in [0_i64, 1, 99, 100, 999, 1234, 100_000, 987_654_321] {
            let major = to_major_units(cents);
            assert_eq!(to_minor_units(major).unwrap(), cents);
            assert_eq!(to_major_units(to_minor_units(major).unwrap()), major);
        }
    }

    #[test]
    fn inverse_conversion_keeps_two_places() {
        assert_eq!(to_major_units(999), dec!(9.99));
        assert_eq!(to_major_units(350).to_string(), "3.50");
    }

    #[test]
    fn out_of_range_amount_is_rejected() {
        let err = to_minor_units(Decimal::MAX).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn absent_money_is_zero() {
        assert_eq!(major_or_zero(None), Decimal::ZERO);
        assert_eq!(major_or_zero(Some(&Money::new(1250))), dec!(12.50));
    }
}
