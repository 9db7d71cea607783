//! Scheduler read side.
//!
//! Each query re-derives its work list from current storage state, so a
//! crashed sweep simply picks up where the data says on the next tick.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::domain::foundation::{DomainError, OrderId, SubscriptionId, Timestamp};

/// When repeated automatic charge failures make a subscription overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedChargePolicy {
    /// Failed automatic orders needed inside the window.
    pub threshold: u32,
    /// Look-back window in days.
    pub window_days: u32,
}

impl FailedChargePolicy {
    /// Failures created after this instant count (midnight UTC,
    /// `window_days` before `today`).
    pub fn window_start(&self, today: NaiveDate) -> Timestamp {
        let day = today - Days::new(u64::from(self.window_days));
        Timestamp::from_datetime(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
    }
}

impl Default for FailedChargePolicy {
    fn default() -> Self {
        Self {
            threshold: 3,
            window_days: 3,
        }
    }
}

#[async_trait]
pub trait SweepQueries: Send + Sync {
    /// `active` subscriptions due on or before `today` whose recent failed
    /// automatic charges stay below the policy threshold.
    async fn renewable_subscriptions(
        &self,
        today: NaiveDate,
        policy: FailedChargePolicy,
    ) -> Result<Vec<SubscriptionId>, DomainError>;

    /// Due `active` subscriptions at or above the failure threshold, plus
    /// due `cancelled` subscriptions.
    async fn overdue_subscriptions(
        &self,
        today: NaiveDate,
        policy: FailedChargePolicy,
    ) -> Result<Vec<SubscriptionId>, DomainError>;

    async fn pre_active_subscriptions(&self) -> Result<Vec<SubscriptionId>, DomainError>;

    async fn subscriptions_to_deactivate(&self) -> Result<Vec<SubscriptionId>, DomainError>;

    /// Every `draft`/`processing` order.
    async fn pending_orders(&self) -> Result<Vec<OrderId>, DomainError>;

    /// `draft`/`processing` orders last modified before `cutoff`.
    async fn abandoned_orders(&self, cutoff: Timestamp) -> Result<Vec<OrderId>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_three_in_three_days() {
        let policy = FailedChargePolicy::default();
        assert_eq!(policy.threshold, 3);
        assert_eq!(policy.window_days, 3);
    }

    #[test]
    fn window_starts_at_midnight_days_back() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let start = FailedChargePolicy::default().window_start(today);
        assert_eq!(start.as_datetime().to_rfc3339(), "2024-03-07T00:00:00+00:00");
    }

    #[test]
    fn sweep_queries_is_object_safe() {
        fn _assert_object_safe(_: &dyn SweepQueries) {}
    }
}
