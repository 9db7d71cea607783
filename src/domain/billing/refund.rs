//! Prorated refund calculation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::money::round_to_minor_precision;

/// Computes the refund owed for the unused part of a subscription window.
///
/// Returns `None` when the window has already closed (`end_date` before
/// `today`) or the product has no period. The unused share is counted in
/// whole calendar days and never exceeds the amount paid.
pub fn calculate_refund_amount(
    end_date: NaiveDate,
    today: NaiveDate,
    payment_amount: Decimal,
    period_days: u32,
) -> Option<Decimal> {
    if end_date < today || period_days == 0 {
        return None;
    }

    let days_remaining = (end_date - today).num_days();
    let prorated = payment_amount * Decimal::from(days_remaining) / Decimal::from(period_days);

    Some(round_to_minor_precision(prorated.min(payment_amount)))
}
