//! ActivateSubscriptionHandler - opens a subscription window.
//!
//! The role is granted before the new state is written. If the grant fails
//! the subscription stays `pre_active` and the activation sweep tries again.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::ports::{BillingRepository, EntitlementService};

use super::roles::grant_product_role;

#[derive(Debug, Clone)]
pub struct ActivateSubscriptionCommand {
    pub subscription_id: SubscriptionId,
}

pub struct ActivateSubscriptionHandler {
    repository: Arc<dyn BillingRepository>,
    entitlements: Arc<dyn EntitlementService>,
}

impl ActivateSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn BillingRepository>,
        entitlements: Arc<dyn EntitlementService>,
    ) -> Self {
        Self {
            repository,
            entitlements,
        }
    }

    pub async fn handle(&self, cmd: ActivateSubscriptionCommand) -> Result<Subscription, BillingError> {
        let details = self
            .repository
            .find_subscription(&cmd.subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(cmd.subscription_id))?;

        // Refuse illegal moves before touching the role service.
        let now = Timestamp::now();
        let mut preview = details.subscription.clone();
        preview.activate(details.product.period_days, now)?;

        if details.subscription.state.requires_grant_on_activation() {
            grant_product_role(
                self.entitlements.as_ref(),
                &details.subscription.user_id,
                &details.product,
            )
            .await?;
        }

        let mut tx = self.repository.begin().await?;
        let mut subscription = tx
            .lock_subscription(&cmd.subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(cmd.subscription_id))?;
        subscription.activate(details.product.period_days, now)?;
        tx.update_subscription(&subscription).await?;
        tx.commit().await?;

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            end_date = %subscription.end_date,
            "Subscription activated"
        );
        Ok(subscription)
    }
}
