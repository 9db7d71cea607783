//! CancelSubscriptionHandler - user-requested termination.
//!
//! The role is left in place; the daily overdue sweep revokes it once the
//! paid window has run out.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::BillingRepository;

#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
}

pub struct CancelSubscriptionHandler {
    repository: Arc<dyn BillingRepository>,
}

impl CancelSubscriptionHandler {
    pub fn new(repository: Arc<dyn BillingRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: CancelSubscriptionCommand) -> Result<Subscription, BillingError> {
        let current = self
            .repository
            .find_current_subscription(&cmd.user_id)
            .await?
            .ok_or_else(|| BillingError::ActiveSubscriptionNotFound(cmd.user_id.clone()))?;

        let mut tx = self.repository.begin().await?;
        let mut subscription = tx
            .lock_subscription(&current.subscription.id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound(current.subscription.id))?;
        subscription.cancel(Timestamp::now())?;
        tx.update_subscription(&subscription).await?;
        tx.commit().await?;

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %cmd.user_id,
            end_date = %subscription.end_date,
            "Subscription cancelled by user"
        );
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::{user, Fixture};
    use crate::domain::billing::SubscriptionState;

    #[tokio::test]
    async fn current_subscription_is_cancelled_without_revoking() {
        let fx = Fixture::new();
        let product = fx.add_product(30, "10.00").await;
        let (subscription, _, _) = fx.paid_subscription(&product, SubscriptionState::Active, 12).await;

        let cancelled = CancelSubscriptionHandler::new(fx.repository())
            .handle(CancelSubscriptionCommand { user_id: user() })
            .await
            .unwrap();

        assert_eq!(cancelled.id, subscription.id);
        assert_eq!(cancelled.state, SubscriptionState::Cancelled);
        assert_eq!(cancelled.end_date, subscription.end_date);
        assert_eq!(fx.entitlements.revoke_calls(), 0);
    }

    #[tokio::test]
    async fn user_without_subscription_gets_not_found() {
        let fx = Fixture::new();

        let err = CancelSubscriptionHandler::new(fx.repository())
            .handle(CancelSubscriptionCommand { user_id: user() })
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::ActiveSubscriptionNotFound(user()));
    }
}
