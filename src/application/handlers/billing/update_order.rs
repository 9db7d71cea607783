//! UpdateOrderHandler - re-polls an order's gateway state.
//!
//! Repeated polls that report the same state only refresh `modified_at`.
//! When a purchase settles as `paid`, the payment method is saved as the
//! user's default and the subscription moves to `pre_active` in the same
//! transaction as the order update. A recurring charge that settles
//! reactivates the subscription for another period.

use std::sync::Arc;

use crate::application::GatewayRegistry;
use crate::domain::billing::{BillingError, Order, OrderState, SubscriptionState};
use crate::domain::foundation::{OrderId, StateMachine, Timestamp};
use crate::ports::{BillingRepository, EntitlementService};

use super::roles::grant_product_role;
use super::settlement::{gateway_reference, payment_method_of};

#[derive(Debug, Clone)]
pub struct UpdateOrderCommand {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOrderResult {
    pub order_id: OrderId,
    pub state: OrderState,
    /// False when the gateway reported the state already stored.
    pub changed: bool,
}

pub struct UpdateOrderHandler {
    repository: Arc<dyn BillingRepository>,
    gateways: GatewayRegistry,
    entitlements: Arc<dyn EntitlementService>,
}

impl UpdateOrderHandler {
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

    pub async fn handle(&self, cmd: UpdateOrderCommand) -> Result<UpdateOrderResult, BillingError> {
        let details = self
            .repository
            .find_order(&cmd.order_id)
            .await?
            .ok_or(BillingError::OrderNotFound(cmd.order_id))?;
        ensure_open(&details.order)?;

        let gateway = self.gateways.resolve(details.order.payment_system)?;
        let external_id = gateway_reference(&details.order)?;

        tracing::info!(
            order_id = %cmd.order_id,
            payment_system = %details.order.payment_system,
            "Polling order state"
        );
        let reported = if details.order.is_refund {
            gateway.get_refund_status(external_id).await?
        } else {
            gateway.get_payment_status(external_id).await?
        };

        let now = Timestamp::now();
        let settles = reported == OrderState::Paid;
        let method = if settles && details.order.is_purchase() {
            Some(payment_method_of(gateway.as_ref(), &details.order, now).await?)
        } else {
            None
        };

        let mut tx = self.repository.begin().await?;
        let mut order = tx
            .lock_order(&cmd.order_id)
            .await?
            .ok_or(BillingError::OrderNotFound(cmd.order_id))?;
        ensure_open(&order)?;
        let changed = order.apply_gateway_state(reported, now)?;

        let mut renewed = None;
        if changed && settles && (method.is_some() || order.is_automatic) {
            let mut subscription = tx
                .lock_subscription(&order.subscription_id)
                .await?
                .ok_or(BillingError::SubscriptionNotFound(order.subscription_id))?;

            if let Some(method) = method {
                let saved = tx.save_default_payment_method(&method).await?;
                order.attach_payment_method(saved.id);
                subscription.pre_activate(now)?;
                tx.update_subscription(&subscription).await?;
                tracing::info!(
                    order_id = %order.id,
                    subscription_id = %subscription.id,
                    payment_method_id = %saved.id,
                    "Purchase settled, subscription pre-activated"
                );
            } else if !subscription.state.can_transition_to(&SubscriptionState::Active) {
                // The charge stands; the order still records it.
                tracing::warn!(
                    order_id = %order.id,
                    subscription_id = %subscription.id,
                    state = %subscription.state,
                    "Recurring charge settled for a subscription that cannot renew"
                );
            } else if order.is_automatic {
                let prior = subscription.state;
                subscription.activate(details.product.period_days, now)?;
                tx.update_subscription(&subscription).await?;
                tracing::info!(
                    order_id = %order.id,
                    subscription_id = %subscription.id,
                    end_date = %subscription.end_date,
                    "Recurring charge settled, subscription renewed"
                );
                renewed = Some(prior);
            }
        }

        tx.update_order(&order).await?;
        tx.commit().await?;

        if changed {
            tracing::info!(order_id = %order.id, state = %order.state, "Order state updated");
        } else {
            tracing::debug!(order_id = %order.id, state = %order.state, "Order state unchanged");
        }

        if renewed.is_some_and(|prior: SubscriptionState| prior.requires_grant_on_activation()) {
            grant_product_role(self.entitlements.as_ref(), &order.user_id, &details.product).await?;
        }

        Ok(UpdateOrderResult {
            order_id: order.id,
            state: order.state,
            changed,
        })
    }
}

/// Settled orders accept no further updates.
pub(super) fn ensure_open(order: &Order) -> Result<(), BillingError> {
    match order.state {
        OrderState::Paid => Err(BillingError::OrderAlreadyPaid(order.id)),
        OrderState::Error => Err(BillingError::OrderSettled(order.id)),
        OrderState::Draft | OrderState::Processing => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::{user, Fixture};
    use crate::application::handlers::billing::{StartPaymentCommand, StartPaymentHandler};
    use crate::domain::billing::Subscription;
    use crate::ports::{GatewayError, PaymentGateway};

    fn handler(fx: &Fixture) -> UpdateOrderHandler {
        UpdateOrderHandler::new(fx.repository(), fx.registry.clone(), fx.entitlement_service())
    }

    async fn purchase(fx: &Fixture) -> Order {
        let product = fx.add_product(30, "10.00").await;
        let session = StartPaymentHandler::new(fx.repository(), fx.registry.clone())
            .handle(StartPaymentCommand {
                user_id: user(),
                product_id: product.id,
                email: "user@example.com".to_string(),
                payment_system: "stripe".to_string(),
            })
            .await
            .unwrap();
        fx.repo.order(&session.order_id).await.unwrap()
    }

    fn command(order: &Order) -> UpdateOrderCommand {
        UpdateOrderCommand { order_id: order.id }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Purchase Settlement Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_purchase_saves_default_method_and_pre_activates() {
        let fx = Fixture::new();
        let order = purchase(&fx).await;
        fx.gateway
            .settle_payment(order.external_id.as_deref().unwrap(), OrderState::Paid);

        let result = handler(&fx).handle(command(&order)).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.state, OrderState::Paid);

        let stored = fx.repo.order(&order.id).await.unwrap();
        let method_id = stored.payment_method_id.expect("method attached");
        let subscription = fx.repo.subscription(&order.subscription_id).await.unwrap();
        assert_eq!(subscription.state, SubscriptionState::PreActive);

        let default = fx.repository().find_default_payment_method(&user()).await.unwrap().unwrap();
        assert_eq!(default.id, method_id);
        assert_eq!(default.display_data["last4"], "4242");
    }

    #[tokio::test]
    async fn unchanged_state_only_refreshes_modified() {
        let fx = Fixture::new();
        let order = purchase(&fx).await;
        let subscription_before = fx.repo.subscription(&order.subscription_id).await.unwrap();

        let result = handler(&fx).handle(command(&order)).await.unwrap();
        let again = handler(&fx).handle(command(&order)).await.unwrap();

        assert!(!result.changed);
        assert!(!again.changed);
        let stored = fx.repo.order(&order.id).await.unwrap();
        assert_eq!(stored.state, OrderState::Draft);
        assert!(!stored.modified_at.is_before(&order.modified_at));
        assert_eq!(
            fx.repo.subscription(&order.subscription_id).await.unwrap().state,
            subscription_before.state
        );
        assert_eq!(fx.gateway.call_count("get_payment_method"), 0);
    }

    #[tokio::test]
    async fn processing_payment_moves_order_only() {
        let fx = Fixture::new();
        let order = purchase(&fx).await;
        fx.gateway
            .settle_payment(order.external_id.as_deref().unwrap(), OrderState::Processing);

        let result = handler(&fx).handle(command(&order)).await.unwrap();

        assert_eq!(result.state, OrderState::Processing);
        let subscription: Subscription = fx.repo.subscription(&order.subscription_id).await.unwrap();
        assert_eq!(subscription.state, SubscriptionState::Inactive);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Settled Order Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_order_is_rejected_and_left_alone() {
        let fx = Fixture::new();
        let product = fx.add_product(30, "10.00").await;
        let (_, paid, _) = fx.paid_subscription(&product, SubscriptionState::Active, 10).await;

        let err = handler(&fx).handle(command(&paid)).await.unwrap_err();

        assert_eq!(err, BillingError::OrderAlreadyPaid(paid.id));
        assert_eq!(fx.repo.order(&paid.id).await.unwrap().state, OrderState::Paid);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let fx = Fixture::new();
        let id = OrderId::new();

        let err = handler(&fx).handle(UpdateOrderCommand { order_id: id }).await.unwrap_err();

        assert_eq!(err, BillingError::OrderNotFound(id));
    }

    #[tokio::test]
    async fn gateway_failure_changes_nothing() {
        let fx = Fixture::new();
        let order = purchase(&fx).await;
        fx.gateway
            .set_method_error("get_payment_status", GatewayError::network("reset"));

        let err = handler(&fx).handle(command(&order)).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(fx.repo.order(&order.id).await.unwrap(), order);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Recurring and Refund Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn settled_recurring_charge_renews_subscription() {
        let fx = Fixture::new();
        let product = fx.add_product(30, "10.00").await;
        let (subscription, paid, method) =
            fx.paid_subscription(&product, SubscriptionState::Active, 0).await;

        let payment = fx
            .gateway
            .create_recurring_payment("user-1", 1000, "USD", &method.external_id)
            .await
            .unwrap();
        fx.gateway.settle_payment(&payment.id, OrderState::Processing);
        let mut recurring = Order::recurring_from(&paid, &method, Timestamp::now());
        recurring.external_id = Some(payment.id.clone());
        recurring.state = OrderState::Processing;
        fx.repo.put_order(recurring.clone()).await;

        fx.gateway.settle_payment(&payment.id, OrderState::Paid);
        handler(&fx).handle(command(&recurring)).await.unwrap();

        let renewed = fx.repo.subscription(&subscription.id).await.unwrap();
        assert_eq!(renewed.state, SubscriptionState::Active);
        assert_eq!(
            (renewed.end_date.date() - Timestamp::now().date()).num_days(),
            30
        );
        // Renewals of an active subscription do not touch the role.
        assert_eq!(fx.entitlements.grant_calls(), 0);
    }

    #[tokio::test]
    async fn recurring_charge_settling_after_cancel_is_still_recorded() {
        let fx = Fixture::new();
        let product = fx.add_product(30, "10.00").await;
        let (subscription, paid, method) =
            fx.paid_subscription(&product, SubscriptionState::Active, 0).await;

        let payment = fx
            .gateway
            .create_recurring_payment("user-1", 1000, "USD", &method.external_id)
            .await
            .unwrap();
        fx.gateway.settle_payment(&payment.id, OrderState::Processing);
        let mut recurring = Order::recurring_from(&paid, &method, Timestamp::now());
        recurring.external_id = Some(payment.id.clone());
        recurring.state = OrderState::Processing;
        fx.repo.put_order(recurring.clone()).await;

        // The user cancels while the charge is still processing.
        let mut cancelled = subscription.clone();
        cancelled.state = SubscriptionState::Cancelled;
        fx.repo.put_subscription(cancelled).await;

        fx.gateway.settle_payment(&payment.id, OrderState::Paid);
        let result = handler(&fx).handle(command(&recurring)).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.state, OrderState::Paid);
        assert_eq!(fx.repo.order(&recurring.id).await.unwrap().state, OrderState::Paid);
        let stored = fx.repo.subscription(&subscription.id).await.unwrap();
        assert_eq!(stored.state, SubscriptionState::Cancelled);
        assert_eq!(stored.end_date, subscription.end_date);
        assert_eq!(fx.entitlements.grant_calls(), 0);
    }

    #[tokio::test]
    async fn refund_orders_poll_refund_status() {
        let fx = Fixture::new();
        let product = fx.add_product(30, "30.00").await;
        let (_, paid, _) = fx.paid_subscription(&product, SubscriptionState::ToDeactivate, 20).await;

        fx.gateway.set_next_refund_state(OrderState::Processing);
        let refund = fx
            .gateway
            .create_refund(paid.external_id.as_deref().unwrap(), 2000)
            .await
            .unwrap();
        let mut order = Order::refund_of(&paid, "20.00".parse().unwrap(), Timestamp::now()).unwrap();
        order.external_id = Some(refund.id.clone());
        order.state = OrderState::Processing;
        fx.repo.put_order(order.clone()).await;

        fx.gateway.settle_refund(&refund.id, OrderState::Paid);
        let result = handler(&fx).handle(command(&order)).await.unwrap();

        assert_eq!(result.state, OrderState::Paid);
        assert_eq!(fx.gateway.call_count("get_refund_status"), 1);
        assert_eq!(fx.gateway.call_count("get_payment_method"), 0);
    }
}
