//! Billing command and query handlers.
//!
//! One handler per reconciliation operation. Every handler calls the
//! gateway or role service before opening its transaction, so no database
//! transaction is ever held across a network call.

mod activate_subscription;
mod cancel_order;
mod cancel_subscription;
mod deactivate_subscription;
mod get_draft_order;
mod queries;
mod recurring_charge;
mod refund_subscription;
mod roles;
mod settlement;
mod start_payment;
mod update_order;

#[cfg(test)]
pub(crate) mod test_support;

pub use activate_subscription::{ActivateSubscriptionCommand, ActivateSubscriptionHandler};
pub use cancel_order::{CancelOrderCommand, CancelOrderHandler};
pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use deactivate_subscription::{DeactivateSubscriptionCommand, DeactivateSubscriptionHandler};
pub use get_draft_order::{GetDraftOrderHandler, GetDraftOrderQuery};
pub use queries::{GetSubscriptionHandler, ListPaymentMethodsHandler, ListProductsHandler};
pub use recurring_charge::{RecurringChargeCommand, RecurringChargeHandler};
pub use refund_subscription::{RefundResult, RefundSubscriptionCommand, RefundSubscriptionHandler};
pub use start_payment::{PaymentSession, StartPaymentCommand, StartPaymentHandler};
pub use update_order::{UpdateOrderCommand, UpdateOrderHandler, UpdateOrderResult};
