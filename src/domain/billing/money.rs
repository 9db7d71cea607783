//! Conversions between decimal amounts and gateway minor units.
//!
//! Amounts stay `Decimal` everywhere inside billing. Rounding happens only
//! here, at the gateway boundary, half-to-even on two decimal places.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::BillingError;

const MINOR_UNIT_SCALE: u32 = 2;

/// Rounds an amount to the currency's minor-unit precision.
pub fn round_to_minor_precision(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Converts a decimal amount into integer minor units (cents).
pub fn to_minor_units(amount: Decimal) -> Result<i64, BillingError> {
    if amount.is_sign_negative() {
        return Err(BillingError::validation("amount", "must not be negative"));
    }
    let cents = round_to_minor_precision(amount) * Decimal::ONE_HUNDRED;
    cents
        .to_i64()
        .ok_or_else(|| BillingError::validation("amount", "does not fit into minor units"))
}

/// Converts integer minor units back into a decimal amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}
