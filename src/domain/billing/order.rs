//! Order aggregate: one payment or refund attempt.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    OrderId, PaymentMethodId, ProductId, StateMachine, SubscriptionId, Timestamp, UserId,
    ValidationError,
};

use super::{money, BillingError, OrderState, PaymentMethod, PaymentSystem, Product};

/// Append-only ledger entry for a charge or refund.
///
/// Related records are referenced by id only. Three flavours exist:
/// user purchases (`!is_automatic && !is_refund`), recurring charges
/// (`is_automatic`) and refunds (`is_refund`, always with `src_order_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Gateway-side id, known once the gateway accepted the request.
    pub external_id: Option<String>,
    pub user_id: UserId,
    pub user_email: String,
    pub product_id: ProductId,
    pub subscription_id: SubscriptionId,
    pub payment_method_id: Option<PaymentMethodId>,
    pub payment_system: PaymentSystem,
    pub payment_amount: Decimal,
    pub payment_currency_code: String,
    pub state: OrderState,
    pub is_automatic: bool,
    pub is_refund: bool,
    pub src_order_id: Option<OrderId>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Order {
    /// A user-initiated purchase of `product` at its current price.
    pub fn purchase(
        user_id: UserId,
        user_email: impl Into<String>,
        product: &Product,
        subscription_id: SubscriptionId,
        payment_system: PaymentSystem,
        now: Timestamp,
    ) -> Self {
        Self {
            id: OrderId::new(),
            external_id: None,
            user_id,
            user_email: user_email.into(),
            product_id: product.id,
            subscription_id,
            payment_method_id: None,
            payment_system,
            payment_amount: product.price,
            payment_currency_code: product.currency_code.clone(),
            state: OrderState::Draft,
            is_automatic: false,
            is_refund: false,
            src_order_id: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// A recurring charge repeating the terms of `previous` on the saved method.
    pub fn recurring_from(previous: &Order, payment_method: &PaymentMethod, now: Timestamp) -> Self {
        Self {
            id: OrderId::new(),
            external_id: None,
            user_id: previous.user_id.clone(),
            user_email: previous.user_email.clone(),
            product_id: previous.product_id,
            subscription_id: previous.subscription_id,
            payment_method_id: Some(payment_method.id),
            payment_system: payment_method.payment_system,
            payment_amount: previous.payment_amount,
            payment_currency_code: previous.payment_currency_code.clone(),
            state: OrderState::Draft,
            is_automatic: true,
            is_refund: false,
            src_order_id: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// A refund of `amount` against the paid order `src`.
    pub fn refund_of(src: &Order, amount: Decimal, now: Timestamp) -> Result<Self, BillingError> {
        if src.state != OrderState::Paid || src.is_refund {
            return Err(BillingError::PaidOrderNotFound(src.subscription_id));
        }
        if amount <= Decimal::ZERO || amount > src.payment_amount {
            return Err(BillingError::validation(
                "amount",
                format!("refund must be within (0, {}]", src.payment_amount),
            ));
        }

        Ok(Self {
            id: OrderId::new(),
            external_id: None,
            user_id: src.user_id.clone(),
            user_email: src.user_email.clone(),
            product_id: src.product_id,
            subscription_id: src.subscription_id,
            payment_method_id: src.payment_method_id,
            payment_system: src.payment_system,
            payment_amount: amount,
            payment_currency_code: src.payment_currency_code.clone(),
            state: OrderState::Draft,
            is_automatic: false,
            is_refund: true,
            src_order_id: Some(src.id),
            created_at: now,
            modified_at: now,
        })
    }

    /// True for orders a user placed by hand (not recurring, not refund).
    pub fn is_purchase(&self) -> bool {
        !self.is_automatic && !self.is_refund
    }

    /// Amount in gateway minor units.
    pub fn amount_minor_units(&self) -> Result<i64, BillingError> {
        money::to_minor_units(self.payment_amount)
    }

    /// Records the gateway's answer to the create call.
    pub fn record_submission(
        &mut self,
        external_id: impl Into<String>,
        state: OrderState,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(state)?;
        self.external_id = Some(external_id.into());
        self.modified_at = now;
        Ok(())
    }

    /// Applies a polled gateway state.
    ///
    /// Returns `true` if the state changed. An unchanged state only
    /// refreshes `modified_at`.
    pub fn apply_gateway_state(
        &mut self,
        reported: OrderState,
        now: Timestamp,
    ) -> Result<bool, ValidationError> {
        let next = self.state.transition_to(reported)?;
        let changed = next != self.state;
        self.state = next;
        self.modified_at = now;
        Ok(changed)
    }

    /// Gives up on an outstanding order.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(OrderState::Error)?;
        self.modified_at = now;
        Ok(())
    }

    pub fn attach_payment_method(&mut self, payment_method_id: PaymentMethodId) {
        self.payment_method_id = Some(payment_method_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product() -> Product {
        Product {
            id: ProductId::new(),
            name: "Monthly".to_string(),
            description: "30 days of access".to_string(),
            price: Decimal::new(1000, 2),
            currency_code: "usd".to_string(),
            period_days: 30,
            role_id: "subscriber".to_string(),
            active: true,
            created_at: Timestamp::now(),
            modified_at: Timestamp::now(),
        }
    }

    fn purchase() -> Order {
        Order::purchase(
            UserId::new("user-1").unwrap(),
            "user@example.com",
            &product(),
            SubscriptionId::new(),
            PaymentSystem::Stripe,
            Timestamp::now(),
        )
    }

    fn paid_purchase() -> Order {
        let mut order = purchase();
        order.record_submission("pi_1", OrderState::Paid, Timestamp::now()).unwrap();
        order
    }

    #[test]
    fn purchase_starts_as_draft_at_product_price() {
        let order = purchase();
        assert_eq!(order.state, OrderState::Draft);
        assert_eq!(order.payment_amount, Decimal::new(1000, 2));
        assert!(order.is_purchase());
        assert!(order.external_id.is_none());
    }

    #[test]
    fn recurring_copies_terms_and_flags_automatic() {
        let previous = paid_purchase();
        let method = PaymentMethod::new_default(
            previous.user_id.clone(),
            "pm_1",
            PaymentSystem::Stripe,
            "card",
            json!({}),
            Timestamp::now(),
        );

        let order = Order::recurring_from(&previous, &method, Timestamp::now());

        assert!(order.is_automatic);
        assert!(!order.is_refund);
        assert_eq!(order.payment_method_id, Some(method.id));
        assert_eq!(order.subscription_id, previous.subscription_id);
        assert_eq!(order.payment_amount, previous.payment_amount);
    }

    #[test]
    fn refund_points_at_source_order() {
        let src = paid_purchase();
        let refund = Order::refund_of(&src, Decimal::new(500, 2), Timestamp::now()).unwrap();

        assert!(refund.is_refund);
        assert!(!refund.is_automatic);
        assert_eq!(refund.src_order_id, Some(src.id));
        assert_eq!(refund.payment_amount, Decimal::new(500, 2));
    }

    #[test]
    fn refund_requires_paid_source() {
        let err = Order::refund_of(&purchase(), Decimal::ONE, Timestamp::now()).unwrap_err();
        assert!(matches!(err, BillingError::PaidOrderNotFound(_)));
    }

    #[test]
    fn refund_cannot_exceed_payment() {
        let src = paid_purchase();
        assert!(Order::refund_of(&src, Decimal::new(1001, 2), Timestamp::now()).is_err());
        assert!(Order::refund_of(&src, Decimal::ZERO, Timestamp::now()).is_err());
    }

    #[test]
    fn unchanged_poll_reports_no_change() {
        let mut order = purchase();
        order.record_submission("pi_1", OrderState::Processing, Timestamp::now()).unwrap();

        let changed = order.apply_gateway_state(OrderState::Processing, Timestamp::now()).unwrap();

        assert!(!changed);
        assert_eq!(order.state, OrderState::Processing);
    }

    #[test]
    fn paid_order_rejects_cancel_and_updates() {
        let mut order = paid_purchase();
        assert!(order.cancel(Timestamp::now()).is_err());
        assert!(order.apply_gateway_state(OrderState::Error, Timestamp::now()).is_err());
        assert_eq!(order.state, OrderState::Paid);
    }

    #[test]
    fn cancel_moves_outstanding_order_to_error() {
        let mut order = purchase();
        order.cancel(Timestamp::now()).unwrap();
        assert_eq!(order.state, OrderState::Error);
    }

    #[test]
    fn minor_units_use_cents() {
        assert_eq!(purchase().amount_minor_units().unwrap(), 1000);
    }
}
