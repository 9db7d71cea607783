//! Drives sweep groups on their cadences until shutdown.
//!
//! One tokio task per group. Sweeps inside a group run one after another,
//! groups overlap freely.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::foundation::Timestamp;

use super::cadence::Cadence;
use super::sweep::{Sweep, Sweeper};

/// Sweeps that share a cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepGroup {
    pub cadence: Cadence,
    pub sweeps: Vec<Sweep>,
}

impl SweepGroup {
    pub fn new(cadence: Cadence, sweeps: Vec<Sweep>) -> Self {
        Self { cadence, sweeps }
    }
}

pub struct SchedulerRunner {
    sweeper: Arc<Sweeper>,
    groups: Vec<SweepGroup>,
}

impl SchedulerRunner {
    pub fn new(sweeper: Arc<Sweeper>, groups: Vec<SweepGroup>) -> Self {
        Self { sweeper, groups }
    }

    /// Spawns one task per group. Tasks exit once `shutdown` flips to true.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        self.groups
            .into_iter()
            .map(|group| {
                let sweeper = Arc::clone(&self.sweeper);
                let shutdown = shutdown.clone();
                tokio::spawn(run_group(sweeper, group, shutdown))
            })
            .collect()
    }
}

async fn run_group(sweeper: Arc<Sweeper>, group: SweepGroup, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(cadence = ?group.cadence, sweeps = ?group.sweeps, "Sweep group started");

    loop {
        let wait = group.cadence.wait_from(Utc::now());
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        for sweep in &group.sweeps {
            if let Err(error) = sweeper.run(*sweep, Timestamp::now()).await {
                tracing::error!(sweep = %sweep, error = %error, "Sweep query failed");
            }
        }
    }

    tracing::info!(sweeps = ?group.sweeps, "Sweep group stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::SweeperConfig;
    use crate::domain::foundation::{DomainError, OrderId, SubscriptionId};
    use crate::ports::{FailedChargePolicy, ReconciliationApi, ServiceCallError, SweepQueries};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct OneOrder;

    #[async_trait]
    impl SweepQueries for OneOrder {
        async fn renewable_subscriptions(
            &self,
            _today: NaiveDate,
            _policy: FailedChargePolicy,
        ) -> Result<Vec<SubscriptionId>, DomainError> {
            Ok(vec![])
        }

        async fn overdue_subscriptions(
            &self,
            _today: NaiveDate,
            _policy: FailedChargePolicy,
        ) -> Result<Vec<SubscriptionId>, DomainError> {
            Ok(vec![])
        }

        async fn pre_active_subscriptions(&self) -> Result<Vec<SubscriptionId>, DomainError> {
            Ok(vec![])
        }

        async fn subscriptions_to_deactivate(&self) -> Result<Vec<SubscriptionId>, DomainError> {
            Ok(vec![])
        }

        async fn pending_orders(&self) -> Result<Vec<OrderId>, DomainError> {
            Ok(vec![OrderId::new()])
        }

        async fn abandoned_orders(&self, _cutoff: Timestamp) -> Result<Vec<OrderId>, DomainError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct CountingApi {
        updates: AtomicUsize,
    }

    #[async_trait]
    impl ReconciliationApi for CountingApi {
        async fn update_order(&self, _id: OrderId) -> Result<(), ServiceCallError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn cancel_order(&self, _id: OrderId) -> Result<(), ServiceCallError> {
            Ok(())
        }

        async fn activate_subscription(&self, _id: SubscriptionId) -> Result<(), ServiceCallError> {
            Ok(())
        }

        async fn recurring_charge(&self, _id: SubscriptionId) -> Result<(), ServiceCallError> {
            Ok(())
        }

        async fn deactivate_subscription(&self, _id: SubscriptionId) -> Result<(), ServiceCallError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn group_ticks_until_shutdown() {
        let api = Arc::new(CountingApi::default());
        let sweeper = Sweeper::new(
            Arc::new(OneOrder),
            api.clone(),
            SweeperConfig {
                request_delay: Duration::ZERO,
                ..SweeperConfig::default()
            },
        );
        let runner = SchedulerRunner::new(
            Arc::new(sweeper),
            vec![SweepGroup::new(
                Cadence::Every(Duration::from_millis(10)),
                vec![Sweep::PollPendingOrders],
            )],
        );
        let (stop, shutdown) = watch::channel(false);

        let handles = runner.spawn(shutdown);
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.send(true).unwrap();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }

        assert!(api.updates.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn daily_group_stops_without_firing() {
        let api = Arc::new(CountingApi::default());
        let sweeper = Sweeper::new(Arc::new(OneOrder), api.clone(), SweeperConfig::default());
        let next_hour = (Utc::now() + chrono::Duration::hours(1)).time();
        let runner = SchedulerRunner::new(
            Arc::new(sweeper),
            vec![SweepGroup::new(
                Cadence::DailyAt(next_hour),
                vec![Sweep::PollPendingOrders],
            )],
        );
        let (stop, shutdown) = watch::channel(false);

        let handles = runner.spawn(shutdown);
        stop.send(true).unwrap();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }

        assert_eq!(api.updates.load(Ordering::SeqCst), 0);
    }
}
