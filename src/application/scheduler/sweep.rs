//! Sweep definitions and the per-item replay loop.
//!
//! A sweep re-derives its work list from storage on every run and replays
//! one service operation per item, sleeping `request_delay` after each call.
//! A failed item is logged and counted; it never stops the rest of the run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{DomainError, OrderId, SubscriptionId, Timestamp};
use crate::ports::{FailedChargePolicy, ReconciliationApi, ServiceCallError, SweepQueries};

/// The fixed set of sweeps the scheduler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sweep {
    /// `draft`/`processing` orders -> update order.
    PollPendingOrders,
    /// Orders stuck unsettled past the cutoff -> cancel order.
    CancelAbandonedOrders,
    /// `pre_active` subscriptions -> activate.
    ActivatePending,
    /// `to_deactivate` subscriptions -> deactivate.
    DeactivateRefunded,
    /// Due, healthy `active` subscriptions -> recurring charge.
    RenewDue,
    /// Due subscriptions with repeated failed charges, and lapsed cancelled
    /// ones -> deactivate.
    DeactivateOverdue,
}

impl Sweep {
    pub fn name(&self) -> &'static str {
        match self {
            Sweep::PollPendingOrders => "poll_pending_orders",
            Sweep::CancelAbandonedOrders => "cancel_abandoned_orders",
            Sweep::ActivatePending => "activate_pending_subscriptions",
            Sweep::DeactivateRefunded => "deactivate_refunded_subscriptions",
            Sweep::RenewDue => "renew_due_subscriptions",
            Sweep::DeactivateOverdue => "deactivate_overdue_subscriptions",
        }
    }
}

impl fmt::Display for Sweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Order(OrderId),
    Subscription(SubscriptionId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Order(id) => write!(f, "order {}", id),
            Target::Subscription(id) => write!(f, "subscription {}", id),
        }
    }
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub sweep: Sweep,
    pub attempted: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed
    }
}

/// Knobs of the sweep predicates and pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Pause after every service call.
    pub request_delay: Duration,
    pub failed_charges: FailedChargePolicy,
    /// Unsettled orders untouched for longer than this are cancelled.
    pub abandoned_order_days: i64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_secs(1),
            failed_charges: FailedChargePolicy::default(),
            abandoned_order_days: 10,
        }
    }
}

/// Finds sweep targets and replays service operations over them.
pub struct Sweeper {
    queries: Arc<dyn SweepQueries>,
    api: Arc<dyn ReconciliationApi>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(
        queries: Arc<dyn SweepQueries>,
        api: Arc<dyn ReconciliationApi>,
        config: SweeperConfig,
    ) -> Self {
        Self { queries, api, config }
    }

    /// Runs one sweep as of `now`. Only the target query can fail the run.
    pub async fn run(&self, sweep: Sweep, now: Timestamp) -> Result<SweepReport, DomainError> {
        let targets = self.targets(sweep, now).await?;
        let mut report = SweepReport {
            sweep,
            attempted: 0,
            failed: 0,
        };

        if !targets.is_empty() {
            tracing::debug!(sweep = %sweep, count = targets.len(), "Sweep started");
        }

        for target in targets {
            report.attempted += 1;
            tracing::info!(sweep = %sweep, target = %target, "Replaying service call");

            if let Err(error) = self.dispatch(sweep, target).await {
                report.failed += 1;
                tracing::error!(sweep = %sweep, target = %target, error = %error, "Service call failed");
            }

            if !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }
        }

        if report.attempted > 0 {
            tracing::info!(
                sweep = %sweep,
                attempted = report.attempted,
                failed = report.failed,
                "Sweep finished"
            );
        }
        Ok(report)
    }

    async fn targets(&self, sweep: Sweep, now: Timestamp) -> Result<Vec<Target>, DomainError> {
        let today = now.date();
        let policy = self.config.failed_charges;

        let targets = match sweep {
            Sweep::PollPendingOrders => orders(self.queries.pending_orders().await?),
            Sweep::CancelAbandonedOrders => {
                let cutoff = now.minus_days(self.config.abandoned_order_days);
                orders(self.queries.abandoned_orders(cutoff).await?)
            }
            Sweep::ActivatePending => subscriptions(self.queries.pre_active_subscriptions().await?),
            Sweep::DeactivateRefunded => {
                subscriptions(self.queries.subscriptions_to_deactivate().await?)
            }
            Sweep::RenewDue => {
                subscriptions(self.queries.renewable_subscriptions(today, policy).await?)
            }
            Sweep::DeactivateOverdue => {
                subscriptions(self.queries.overdue_subscriptions(today, policy).await?)
            }
        };
        Ok(targets)
    }

    async fn dispatch(&self, sweep: Sweep, target: Target) -> Result<(), ServiceCallError> {
        match (sweep, target) {
            (Sweep::PollPendingOrders, Target::Order(id)) => self.api.update_order(id).await,
            (Sweep::CancelAbandonedOrders, Target::Order(id)) => self.api.cancel_order(id).await,
            (Sweep::ActivatePending, Target::Subscription(id)) => {
                self.api.activate_subscription(id).await
            }
            (Sweep::RenewDue, Target::Subscription(id)) => self.api.recurring_charge(id).await,
            (Sweep::DeactivateRefunded | Sweep::DeactivateOverdue, Target::Subscription(id)) => {
                self.api.deactivate_subscription(id).await
            }
            (sweep, target) => Err(ServiceCallError::Rejected {
                status: 400,
                code: "SWEEP_TARGET_MISMATCH".to_string(),
                message: format!("{} cannot process {}", sweep, target),
            }),
        }
    }
}

fn orders(ids: Vec<OrderId>) -> Vec<Target> {
    ids.into_iter().map(Target::Order).collect()
}

fn subscriptions(ids: Vec<SubscriptionId>) -> Vec<Target> {
    ids.into_iter().map(Target::Subscription).collect()
}
