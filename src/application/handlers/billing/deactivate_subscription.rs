//! DeactivateSubscriptionHandler - closes a subscription and revokes its role.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::ports::{BillingRepository, EntitlementService};

use super::roles::revoke_product_role;

#[derive(Debug, Clone)]
pub struct DeactivateSubscriptionCommand {
    pub subscription_id: SubscriptionId,
}

/// Revokes first, then writes `inactive`. A failed revoke leaves the
/// subscription untouched so the next sweep retries it.
pub struct DeactivateSubscriptionHandler {
    repository: Arc<dyn BillingRepository>,
    entitlements: Arc<dyn EntitlementService>,
}

impl DeactivateSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn BillingRepository>,
        entitlements: Arc<dyn EntitlementService>,
    ) -> Self {
        Self {
            repository,
            entitlements,
        }
    }

    pub async fn handle(
        &self,
        cmd: DeactivateSubscriptionCommand,
    ) -> Result<Subscription, BillingError> {
        let details = self
            .repository
            .find_subscription(&cmd.subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(cmd.subscription_id))?;

        let now = Timestamp::now();
        let mut preview = details.subscription.clone();
        preview.deactivate(now)?;

        revoke_product_role(
            self.entitlements.as_ref(),
            &details.subscription.user_id,
            &details.product,
        )
        .await?;

        let mut tx = self.repository.begin().await?;
        let mut subscription = tx
            .lock_subscription(&cmd.subscription_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(cmd.subscription_id))?;
        subscription.deactivate(now)?;
        tx.update_subscription(&subscription).await?;
        tx.commit().await?;

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            "Subscription deactivated"
        );
        Ok(subscription)
    }
}
