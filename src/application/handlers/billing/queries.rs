//! Read-only views for the user API.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentMethod, Product};
use crate::domain::foundation::UserId;
use crate::ports::{BillingRepository, SubscriptionDetails};

/// Products currently on sale.
pub struct ListProductsHandler {
    repository: Arc<dyn BillingRepository>,
}

impl ListProductsHandler {
    pub fn new(repository: Arc<dyn BillingRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self) -> Result<Vec<Product>, BillingError> {
        Ok(self.repository.list_active_products().await?)
    }
}

pub struct ListPaymentMethodsHandler {
    repository: Arc<dyn BillingRepository>,
}

impl ListPaymentMethodsHandler {
    pub fn new(repository: Arc<dyn BillingRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, BillingError> {
        Ok(self.repository.list_payment_methods(user_id).await?)
    }
}

/// The user's `active` or `pre_active` subscription with its product.
pub struct GetSubscriptionHandler {
    repository: Arc<dyn BillingRepository>,
}

impl GetSubscriptionHandler {
    pub fn new(repository: Arc<dyn BillingRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, user_id: &UserId) -> Result<SubscriptionDetails, BillingError> {
        self.repository
            .find_current_subscription(user_id)
            .await?
            .ok_or_else(|| BillingError::ActiveSubscriptionNotFound(user_id.clone()))
    }
}
