//! RefundSubscriptionHandler - pays back the unused part of the window.
//!
//! The refund is prorated over whole days left. Once the gateway accepts
//! the refund the subscription is marked `to_deactivate`; the role is
//! revoked later by the deactivation sweep. The refund order is stored even
//! when a concurrent request already moved the subscription on.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::GatewayRegistry;
use crate::domain::billing::{
    calculate_refund_amount, BillingError, Order, OrderState, SubscriptionState,
};
use crate::domain::foundation::{StateMachine, Timestamp, UserId};
use crate::ports::BillingRepository;

use super::settlement::gateway_reference;

#[derive(Debug, Clone)]
pub struct RefundSubscriptionCommand {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundResult {
    pub refund_order: Order,
    pub amount: Decimal,
}

pub struct RefundSubscriptionHandler {
    repository: Arc<dyn BillingRepository>,
    gateways: GatewayRegistry,
}

impl RefundSubscriptionHandler {
    pub fn new(repository: Arc<dyn BillingRepository>, gateways: GatewayRegistry) -> Self {
        Self { repository, gateways }
    }

    pub async fn handle(&self, cmd: RefundSubscriptionCommand) -> Result<RefundResult, BillingError> {
        let current = self
            .repository
            .find_current_subscription(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::ActiveSubscriptionNotFound(cmd.user_id.clone()))?;
        let subscription_id = current.subscription.id;

        let paid = self
            .repository
            .find_last_paid_order(&subscription_id)
            .await?
            .ok_or(BillingError::PaidOrderNotFound(subscription_id))?;

        let now = Timestamp::now();
        let amount = calculate_refund_amount(
            current.subscription.end_date.date(),
            now.date(),
            paid.payment_amount,
            current.product.period_days,
        )
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| {
            tracing::debug!(subscription_id = %subscription_id, "Nothing left to refund");
            BillingError::SubscriptionExpired(subscription_id)
        })?;

        let mut refund = Order::refund_of(&paid, amount, now)?;
        let gateway = self.gateways.resolve(paid.payment_system)?;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription_id,
            src_order_id = %paid.id,
            amount = %amount,
            "Creating refund"
        );
        let created = gateway
            .create_refund(gateway_reference(&paid)?, refund.amount_minor_units()?)
            .await?;
        refund.record_submission(created.id.clone(), created.state, now)?;

        let mut tx = self.repository.begin().await?;
        tx.insert_order(&refund).await?;
        if refund.state != OrderState::Error {
            let mut subscription = tx
                .lock_subscription(&subscription_id)
                .await?
                .ok_or(BillingError::SubscriptionNotFound(subscription_id))?;
            if subscription.state.can_transition_to(&SubscriptionState::ToDeactivate) {
                subscription.mark_pending_deactivation(now)?;
                tx.update_subscription(&subscription).await?;
            } else {
                tracing::warn!(
                    order_id = %refund.id,
                    subscription_id = %subscription_id,
                    state = %subscription.state,
                    "Refund created for a subscription already leaving active"
                );
            }
        }
        tx.commit().await?;

        if refund.state == OrderState::Error {
            tracing::warn!(order_id = %refund.id, "Refund rejected by gateway");
        } else {
            tracing::info!(
                order_id = %refund.id,
                subscription_id = %subscription_id,
                "Refund created, subscription pending deactivation"
            );
        }

        Ok(RefundResult {
            refund_order: refund,
            amount,
        })
    }
}
