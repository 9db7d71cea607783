//! CancelOrderHandler - gives up on an outstanding order.

use std::sync::Arc;

use crate::domain::billing::{BillingError, OrderState};
use crate::domain::foundation::{OrderId, Timestamp};
use crate::ports::BillingRepository;

use super::update_order::ensure_open;

#[derive(Debug, Clone)]
pub struct CancelOrderCommand {
    pub order_id: OrderId,
}

/// Moves a `draft`/`processing` order to `error`. Paid orders are refused.
pub struct CancelOrderHandler {
    repository: Arc<dyn BillingRepository>,
}

impl CancelOrderHandler {
    pub fn new(repository: Arc<dyn BillingRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: CancelOrderCommand) -> Result<OrderState, BillingError> {
        let mut tx = self.repository.begin().await?;
        let mut order = tx
            .lock_order(&cmd.order_id)
            .await?
            .ok_or(BillingError::OrderNotFound(cmd.order_id))?;
        ensure_open(&order)?;

        order.cancel(Timestamp::now())?;
        tx.update_order(&order).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, "Order cancelled");
        Ok(order.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::{user, Fixture};
    use crate::domain::billing::{Order, PaymentSystem, Subscription, SubscriptionState};

    async fn draft_order(fx: &Fixture, state: OrderState) -> Order {
        let product = fx.add_product(30, "10.00").await;
        let now = Timestamp::now();
        let subscription = Subscription::new(user(), product.id, now);
        let mut order = Order::purchase(
            user(),
            "user@example.com",
            &product,
            subscription.id,
            PaymentSystem::Stripe,
            now,
        );
        order.state = state;
        order.external_id = Some("pi_stale".to_string());
        fx.repo.put_subscription(subscription).await;
        fx.repo.put_order(order.clone()).await;
        order
    }

    #[tokio::test]
    async fn outstanding_orders_move_to_error() {
        for state in [OrderState::Draft, OrderState::Processing] {
            let fx = Fixture::new();
            let order = draft_order(&fx, state).await;

            let result = CancelOrderHandler::new(fx.repository())
                .handle(CancelOrderCommand { order_id: order.id })
                .await
                .unwrap();

            assert_eq!(result, OrderState::Error);
            assert_eq!(fx.repo.order(&order.id).await.unwrap().state, OrderState::Error);
        }
    }

    #[tokio::test]
    async fn paid_order_is_a_conflict() {
        let fx = Fixture::new();
        let product = fx.add_product(30, "10.00").await;
        let (_, paid, _) = fx.paid_subscription(&product, SubscriptionState::Active, 10).await;

        let err = CancelOrderHandler::new(fx.repository())
            .handle(CancelOrderCommand { order_id: paid.id })
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::OrderAlreadyPaid(paid.id));
        assert_eq!(fx.repo.order(&paid.id).await.unwrap().state, OrderState::Paid);
    }

    #[tokio::test]
    async fn cancelled_order_cannot_be_cancelled_again() {
        let fx = Fixture::new();
        let order = draft_order(&fx, OrderState::Error).await;

        let err = CancelOrderHandler::new(fx.repository())
            .handle(CancelOrderCommand { order_id: order.id })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "ORDER_IS_SETTLED");
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let fx = Fixture::new();
        let id = OrderId::new();

        let err = CancelOrderHandler::new(fx.repository())
            .handle(CancelOrderCommand { order_id: id })
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::OrderNotFound(id));
    }
}
