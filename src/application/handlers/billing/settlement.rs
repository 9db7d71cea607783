//! Turning a settled purchase into a saved payment method.

use crate::domain::billing::{BillingError, Order, PaymentMethod};
use crate::domain::foundation::Timestamp;
use crate::ports::PaymentGateway;

/// Reads the instrument `order` was paid with and builds the method that
/// becomes the user's default.
pub(super) async fn payment_method_of(
    gateway: &dyn PaymentGateway,
    order: &Order,
    now: Timestamp,
) -> Result<PaymentMethod, BillingError> {
    let external_id = gateway_reference(order)?;
    let method = gateway.get_payment_method(external_id).await?;

    tracing::debug!(
        order_id = %order.id,
        method_type = %method.method_type,
        "Fetched payment method of settled order"
    );

    Ok(PaymentMethod::new_default(
        order.user_id.clone(),
        method.id,
        order.payment_system,
        method.method_type,
        method.display_data,
        now,
    ))
}

/// Provider id of an order that was submitted to the gateway.
pub(super) fn gateway_reference(order: &Order) -> Result<&str, BillingError> {
    order.external_id.as_deref().ok_or_else(|| {
        BillingError::infrastructure(format!("order {} was never submitted to the gateway", order.id))
    })
}
