//! StartPaymentHandler - a user buys a product.
//!
//! Creates the `inactive` subscription and the `draft` purchase order the
//! gateway payment belongs to. The gateway is called before anything is
//! written, so a failed call leaves no rows behind.

use std::sync::Arc;

use crate::application::GatewayRegistry;
use crate::domain::billing::{BillingError, Order, OrderState, PaymentSystem, Subscription};
use crate::domain::foundation::{DomainError, ErrorCode, OrderId, ProductId, Timestamp, UserId};
use crate::ports::BillingRepository;

use super::settlement::payment_method_of;

#[derive(Debug, Clone)]
pub struct StartPaymentCommand {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub email: String,
    /// Payment system tag as sent by the client, e.g. `stripe`
    pub payment_system: String,
}

/// What the client needs to confirm a payment with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub order_id: OrderId,
    pub payment_system: PaymentSystem,
    pub client_secret: Option<String>,
}

pub struct StartPaymentHandler {
    repository: Arc<dyn BillingRepository>,
    gateways: GatewayRegistry,
}

impl StartPaymentHandler {
    pub fn new(repository: Arc<dyn BillingRepository>, gateways: GatewayRegistry) -> Self {
        Self { repository, gateways }
    }

    pub async fn handle(&self, cmd: StartPaymentCommand) -> Result<PaymentSession, BillingError> {
        let email = cmd.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(BillingError::validation("email", "must be an email address"));
        }
        let (payment_system, gateway) = self.gateways.resolve_tag(&cmd.payment_system)?;

        // 1. Reject users that already pay or are paying
        if self
            .repository
            .find_current_subscription(&cmd.user_id)
            .await?
            .is_some()
        {
            tracing::debug!(user_id = %cmd.user_id, "Payment refused, user has a subscription");
            return Err(BillingError::UserHasSubscription(cmd.user_id));
        }
        if let Some(unpaid) = self.repository.find_unpaid_order(&cmd.user_id).await? {
            tracing::debug!(
                user_id = %cmd.user_id,
                order_id = %unpaid.id,
                state = %unpaid.state,
                "Payment refused, user has an unpaid order"
            );
            return Err(outstanding_order_error(cmd.user_id, &unpaid));
        }

        let product = self
            .repository
            .find_product(&cmd.product_id)
            .await?
            .ok_or(BillingError::ProductNotFound(cmd.product_id))?;
        if !product.is_on_sale() {
            return Err(BillingError::ProductInactive(product.id));
        }

        // 2. Create the payment at the provider
        let now = Timestamp::now();
        let mut subscription = Subscription::new(cmd.user_id.clone(), product.id, now);
        let mut order = Order::purchase(
            cmd.user_id.clone(),
            email,
            &product,
            subscription.id,
            payment_system,
            now,
        );

        tracing::info!(
            user_id = %cmd.user_id,
            product_id = %product.id,
            order_id = %order.id,
            payment_system = %payment_system,
            "Creating payment"
        );
        let customer = gateway.create_customer(&cmd.user_id, email).await?;
        let payment = gateway
            .create_payment(&customer, order.amount_minor_units()?, &order.payment_currency_code)
            .await?;
        order.record_submission(payment.id.clone(), payment.state, now)?;

        // A payment can settle on creation; it will never be polled again.
        let method = if payment.state == OrderState::Paid {
            Some(payment_method_of(gateway.as_ref(), &order, now).await?)
        } else {
            None
        };

        // 3. Persist
        let mut tx = self.repository.begin().await?;
        if tx.has_current_subscription(&cmd.user_id).await? {
            return Err(BillingError::UserHasSubscription(cmd.user_id));
        }
        if let Some(unpaid) = tx.find_unpaid_order(&cmd.user_id).await? {
            return Err(outstanding_order_error(cmd.user_id, &unpaid));
        }
        if let Some(method) = method {
            let saved = tx.save_default_payment_method(&method).await?;
            order.attach_payment_method(saved.id);
            subscription.pre_activate(now)?;
        }
        tx.insert_subscription(&subscription).await?;
        tx.insert_order(&order).await?;
        if let Err(err) = tx.commit().await {
            return Err(self.classify_conflict(&cmd.user_id, err).await);
        }

        tracing::info!(
            order_id = %order.id,
            external_id = %payment.id,
            state = %order.state,
            "Payment created"
        );

        Ok(PaymentSession {
            order_id: order.id,
            payment_system,
            client_secret: payment.client_secret,
        })
    }

    /// A concurrent purchase won the race; report which rule it broke.
    async fn classify_conflict(&self, user_id: &UserId, err: DomainError) -> BillingError {
        if err.code != ErrorCode::Conflict {
            return err.into();
        }
        tracing::warn!(user_id = %user_id, error = %err, "Concurrent purchase detected");
        if let Ok(Some(unpaid)) = self.repository.find_unpaid_order(user_id).await {
            return outstanding_order_error(user_id.clone(), &unpaid);
        }
        BillingError::UserHasSubscription(user_id.clone())
    }
}

fn outstanding_order_error(user_id: UserId, order: &Order) -> BillingError {
    match order.state {
        OrderState::Processing => BillingError::UserHasProcessingOrder(user_id),
        _ => BillingError::UserHasDraftOrder(user_id),
    }
}
