//! The scheduler's view of the service-facing API.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{OrderId, SubscriptionId};

/// Operations a sweep can replay for one record.
#[async_trait]
pub trait ReconciliationApi: Send + Sync {
    async fn update_order(&self, id: OrderId) -> Result<(), ServiceCallError>;

    async fn cancel_order(&self, id: OrderId) -> Result<(), ServiceCallError>;

    async fn activate_subscription(&self, id: SubscriptionId) -> Result<(), ServiceCallError>;

    async fn recurring_charge(&self, id: SubscriptionId) -> Result<(), ServiceCallError>;

    async fn deactivate_subscription(&self, id: SubscriptionId) -> Result<(), ServiceCallError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceCallError {
    /// The service answered with an error body.
    #[error("service rejected call ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("service unreachable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_names_status_and_code() {
        let err = ServiceCallError::Rejected {
            status: 409,
            code: "ORDER_IS_PAID".to_string(),
            message: "Order is already paid".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "service rejected call (409 ORDER_IS_PAID): Order is already paid"
        );
    }

    #[test]
    fn reconciliation_api_is_object_safe() {
        fn _assert_object_safe(_: &dyn ReconciliationApi) {}
    }
}
