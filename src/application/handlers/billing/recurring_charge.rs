//! RecurringChargeHandler - renews a subscription from the saved card.
//!
//! The new order repeats the terms of the last paid order. A declined
//! automatic charge lands in `error` (the gateway adapter applies the
//! decline policy); repeated failures are what the overdue sweep counts.
//! Only an `active` subscription is charged.

use std::sync::Arc;

use crate::application::GatewayRegistry;
use crate::domain::billing::{BillingError, Order, OrderState, SubscriptionState};
use crate::domain::foundation::{StateMachine, SubscriptionId, Timestamp};
use crate::ports::{BillingRepository, EntitlementService};

use super::roles::grant_product_role;

#[derive(Debug, Clone)]
pub struct RecurringChargeCommand {
    pub subscription_id: SubscriptionId,
}

pub struct RecurringChargeHandler {
    repository: Arc<dyn BillingRepository>,
    gateways: GatewayRegistry,
    entitlements: Arc<dyn EntitlementService>,
}

impl RecurringChargeHandler {
    pub fn new(
        repository: Arc<dyn BillingRepository>,
        gateways: GatewayRegistry,
        entitlements: Arc<dyn EntitlementService>,
    ) -> Self {
        Self {
            repository,
            gateways,
            entitlements,
        }
    }

    /// Returns the created automatic order.
    pub async fn handle(&self, cmd: RecurringChargeCommand) -> Result<Order, BillingError> {
        let details = self
            .repository
            .find_subscription(&cmd.subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(cmd.subscription_id))?;
        let user_id = details.subscription.user_id.clone();

        let state = details.subscription.state;
        if state != SubscriptionState::Active {
            tracing::info!(
                subscription_id = %cmd.subscription_id,
                state = %state,
                "Recurring charge refused, subscription is not active"
            );
            return Err(BillingError::invalid_state(
                "subscription",
                state.as_str(),
                SubscriptionState::Active.as_str(),
            ));
        }

        if !details.product.is_on_sale() {
            tracing::info!(
                subscription_id = %cmd.subscription_id,
                product_id = %details.product.id,
                "Recurring charge refused, product is no longer sold"
            );
            return Err(BillingError::ProductInactive(details.product.id));
        }

        let method = self
            .repository
            .find_default_payment_method(&user_id)
            .await?
            .ok_or_else(|| BillingError::PaymentMethodNotFound(user_id.clone()))?;
        let previous = self
            .repository
            .find_last_paid_order(&cmd.subscription_id)
            .await?
            .ok_or(BillingError::PaidOrderNotFound(cmd.subscription_id))?;

        let gateway = self.gateways.resolve(method.payment_system)?;
        let now = Timestamp::now();
        let mut order = Order::recurring_from(&previous, &method, now);

        tracing::info!(
            subscription_id = %cmd.subscription_id,
            order_id = %order.id,
            payment_method_id = %method.id,
            "Creating recurring charge"
        );
        let payment = gateway
            .create_recurring_payment(
                user_id.as_str(),
                order.amount_minor_units()?,
                &order.payment_currency_code,
                &method.external_id,
            )
            .await?;
        order.record_submission(payment.id.clone(), payment.state, now)?;

        let mut tx = self.repository.begin().await?;
        let mut activated_from = None;
        if order.state == OrderState::Paid {
            let mut subscription = tx
                .lock_subscription(&cmd.subscription_id)
                .await?
                .ok_or(BillingError::SubscriptionNotFound(cmd.subscription_id))?;
            if subscription.state.can_transition_to(&SubscriptionState::Active) {
                activated_from = Some(subscription.state);
                subscription.activate(details.product.period_days, now)?;
                tx.update_subscription(&subscription).await?;
            } else {
                // Changed while the charge was in flight; the order still records it.
                tracing::warn!(
                    subscription_id = %cmd.subscription_id,
                    order_id = %order.id,
                    state = %subscription.state,
                    "Recurring charge paid for a subscription that cannot renew"
                );
            }
        }
        tx.insert_order(&order).await?;
        tx.commit().await?;

        tracing::info!(
            subscription_id = %cmd.subscription_id,
            order_id = %order.id,
            external_id = %payment.id,
            state = %order.state,
            "Recurring charge created"
        );

        if let Some(prior) = activated_from {
            if prior.requires_grant_on_activation() {
                grant_product_role(self.entitlements.as_ref(), &user_id, &details.product).await?;
            }
        }

        Ok(order)
    }
}
