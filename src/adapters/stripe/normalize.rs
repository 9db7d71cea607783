//! Maps Stripe statuses onto [`OrderState`] and extracts display data.
//!
//! Decline policy: an intent back in `requires_payment_method` after a
//! failed (or missing) charge is `draft` when the user created it and can
//! retry, `error` when it was an off-session recurring charge.

use serde_json::{json, Value};

use crate::domain::billing::OrderState;
use crate::ports::GatewayError;

use super::models::{
    StripeChargeStatus, StripePaymentIntent, StripePaymentStatus, StripeRefundStatus,
};

pub fn payment_state(intent: &StripePaymentIntent) -> OrderState {
    match intent.status {
        StripePaymentStatus::Succeeded => OrderState::Paid,
        StripePaymentStatus::Processing | StripePaymentStatus::Unknown => OrderState::Processing,
        StripePaymentStatus::RequiresAction | StripePaymentStatus::RequiresConfirmation => {
            OrderState::Draft
        }
        StripePaymentStatus::Canceled => OrderState::Error,
        StripePaymentStatus::RequiresPaymentMethod => {
            let charge_pending = intent
                .latest_charge()
                .map(|c| c.status == StripeChargeStatus::Pending)
                .unwrap_or(false);

            if charge_pending {
                OrderState::Processing
            } else if intent.metadata.is_automatic {
                OrderState::Error
            } else {
                OrderState::Draft
            }
        }
    }
}

pub fn refund_state(status: StripeRefundStatus) -> OrderState {
    match status {
        StripeRefundStatus::Succeeded => OrderState::Paid,
        StripeRefundStatus::Pending
        | StripeRefundStatus::RequiresAction
        | StripeRefundStatus::Unknown => OrderState::Processing,
        StripeRefundStatus::Failed | StripeRefundStatus::Canceled => OrderState::Error,
    }
}

/// Picks the client-displayable fields out of `payment_method_details`.
///
/// Only `card` is supported; other method types are rejected.
pub fn display_data(method_type: &str, details: &Value) -> Result<Value, GatewayError> {
    match method_type {
        "card" => {
            let card = details
                .get("card")
                .ok_or_else(|| GatewayError::invalid_response("card details missing"))?;

            let field = |name: &str| {
                card.get(name)
                    .cloned()
                    .ok_or_else(|| GatewayError::invalid_response(format!("card.{} missing", name)))
            };

            Ok(json!({
                "brand": field("brand")?,
                "exp_month": field("exp_month")?,
                "exp_year": field("exp_year")?,
                "last4": field("last4")?,
            }))
        }
        other => Err(GatewayError::invalid_response(format!(
            "unsupported payment method type '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(status: &str, charge: Option<&str>, automatic: bool) -> StripePaymentIntent {
        let charges = match charge {
            Some(s) => json!({"data": [{"id": "ch_1", "payment_method": "pm_1", "status": s}]}),
            None => json!({"data": []}),
        };
        serde_json::from_value(json!({
            "id": "pi_1",
            "client_secret": "secret",
            "status": status,
            "charges": charges,
            "metadata": {"is_automatic": if automatic { "1" } else { "0" }}
        }))
        .unwrap()
    }

    #[test]
    fn terminal_intent_statuses() {
        assert_eq!(payment_state(&intent("succeeded", Some("succeeded"), false)), OrderState::Paid);
        assert_eq!(payment_state(&intent("canceled", None, true)), OrderState::Error);
    }

    #[test]
    fn in_flight_statuses() {
        assert_eq!(payment_state(&intent("processing", None, false)), OrderState::Processing);
        assert_eq!(payment_state(&intent("requires_action", None, false)), OrderState::Draft);
        assert_eq!(
            payment_state(&intent("requires_confirmation", None, false)),
            OrderState::Draft
        );
    }

    #[test]
    fn manual_decline_returns_to_draft() {
        let state = payment_state(&intent("requires_payment_method", Some("failed"), false));
        assert_eq!(state, OrderState::Draft);
    }

    #[test]
    fn automatic_decline_is_error() {
        let state = payment_state(&intent("requires_payment_method", Some("failed"), true));
        assert_eq!(state, OrderState::Error);
    }

    #[test]
    fn pending_charge_is_processing_for_both_flavours() {
        for automatic in [false, true] {
            let state = payment_state(&intent("requires_payment_method", Some("pending"), automatic));
            assert_eq!(state, OrderState::Processing);
        }
    }

    #[test]
    fn no_charge_yet_follows_decline_policy() {
        assert_eq!(
            payment_state(&intent("requires_payment_method", None, false)),
            OrderState::Draft
        );
        assert_eq!(
            payment_state(&intent("requires_payment_method", None, true)),
            OrderState::Error
        );
    }

    #[test]
    fn refund_statuses() {
        assert_eq!(refund_state(StripeRefundStatus::Succeeded), OrderState::Paid);
        assert_eq!(refund_state(StripeRefundStatus::Pending), OrderState::Processing);
        assert_eq!(refund_state(StripeRefundStatus::Failed), OrderState::Error);
        assert_eq!(refund_state(StripeRefundStatus::Canceled), OrderState::Error);
    }

    #[test]
    fn card_display_data_keeps_four_fields() {
        let details = json!({
            "type": "card",
            "card": {
                "brand": "visa",
                "exp_month": 12,
                "exp_year": 2030,
                "last4": "4242",
                "fingerprint": "secret-ish",
                "country": "US"
            }
        });

        let data = display_data("card", &details).unwrap();

        assert_eq!(
            data,
            json!({"brand": "visa", "exp_month": 12, "exp_year": 2030, "last4": "4242"})
        );
    }

    #[test]
    fn unknown_method_type_is_rejected() {
        assert!(display_data("sepa_debit", &json!({})).is_err());
    }

    #[test]
    fn incomplete_card_is_rejected() {
        let details = json!({"card": {"brand": "visa"}});
        assert!(display_data("card", &details).is_err());
    }
}
