//! GetDraftOrderHandler - resumes an unfinished purchase.

use std::sync::Arc;

use crate::application::GatewayRegistry;
use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::ports::BillingRepository;

use super::settlement::gateway_reference;
use super::start_payment::PaymentSession;

#[derive(Debug, Clone)]
pub struct GetDraftOrderQuery {
    pub user_id: UserId,
}

/// Re-reads the user's outstanding payment from the gateway so the client
/// can confirm it again.
pub struct GetDraftOrderHandler {
    repository: Arc<dyn BillingRepository>,
    gateways: GatewayRegistry,
}

impl GetDraftOrderHandler {
    pub fn new(repository: Arc<dyn BillingRepository>, gateways: GatewayRegistry) -> Self {
        Self { repository, gateways }
    }

    pub async fn handle(&self, query: GetDraftOrderQuery) -> Result<PaymentSession, BillingError> {
        let order = self
            .repository
            .find_unpaid_order(&query.user_id)
            .await?
            .ok_or_else(|| BillingError::NoUnpaidOrder(query.user_id.clone()))?;

        let gateway = self.gateways.resolve(order.payment_system)?;
        let payment = gateway.get_payment(gateway_reference(&order)?).await?;

        tracing::debug!(user_id = %query.user_id, order_id = %order.id, "Draft order returned");
        Ok(PaymentSession {
            order_id: order.id,
            payment_system: order.payment_system,
            client_secret: payment.client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::{user, Fixture};
    use crate::application::handlers::billing::{StartPaymentCommand, StartPaymentHandler};

    #[tokio::test]
    async fn returns_the_client_secret_of_the_outstanding_payment() {
        let fx = Fixture::new();
        let product = fx.add_product(30, "10.00").await;
        let started = StartPaymentHandler::new(fx.repository(), fx.registry.clone())
            .handle(StartPaymentCommand {
                user_id: user(),
                product_id: product.id,
                email: "user@example.com".to_string(),
                payment_system: "stripe".to_string(),
            })
            .await
            .unwrap();

        let draft = GetDraftOrderHandler::new(fx.repository(), fx.registry.clone())
            .handle(GetDraftOrderQuery { user_id: user() })
            .await
            .unwrap();

        assert_eq!(draft, started);
    }

    #[tokio::test]
    async fn user_without_unpaid_order_gets_not_found() {
        let fx = Fixture::new();

        let err = GetDraftOrderHandler::new(fx.repository(), fx.registry.clone())
            .handle(GetDraftOrderQuery { user_id: user() })
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::NoUnpaidOrder(user()));
    }
}
