//! PostgreSQL sweep predicates for the scheduler.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, OrderId, SubscriptionId, Timestamp};
use crate::ports::{FailedChargePolicy, SweepQueries};

use super::billing_repository::db_error;

/// Subscriptions with at least `$3` failed automatic charges created after `$2`.
const FAILING_SUBSCRIPTIONS: &str = r#"
    SELECT subscription_id FROM orders
    WHERE state = 'error' AND is_automatic AND created > $2
    GROUP BY subscription_id
    HAVING count(*) >= $3
"#;

#[derive(Clone)]
pub struct PostgresSweepQueries {
    pool: PgPool,
}

impl PostgresSweepQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn subscription_ids(
        &self,
        sql: &str,
        today: NaiveDate,
        policy: FailedChargePolicy,
    ) -> Result<Vec<SubscriptionId>, DomainError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(sql)
            .bind(today)
            .bind(policy.window_start(today).as_datetime())
            .bind(i64::from(policy.threshold))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to query subscriptions"))?;

        Ok(ids.into_iter().map(SubscriptionId::from_uuid).collect())
    }

    async fn subscriptions_in_state(&self, state: &str) -> Result<Vec<SubscriptionId>, DomainError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM subscriptions WHERE state = $1 ORDER BY created")
                .bind(state)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to query subscriptions"))?;

        Ok(ids.into_iter().map(SubscriptionId::from_uuid).collect())
    }
}

#[async_trait]
impl SweepQueries for PostgresSweepQueries {
    async fn renewable_subscriptions(
        &self,
        today: NaiveDate,
        policy: FailedChargePolicy,
    ) -> Result<Vec<SubscriptionId>, DomainError> {
        let sql = format!(
            "SELECT id FROM subscriptions \
             WHERE state = 'active' AND (end_date AT TIME ZONE 'UTC')::date <= $1 \
               AND id NOT IN ({}) \
             ORDER BY created",
            FAILING_SUBSCRIPTIONS
        );
        self.subscription_ids(&sql, today, policy).await
    }

    async fn overdue_subscriptions(
        &self,
        today: NaiveDate,
        policy: FailedChargePolicy,
    ) -> Result<Vec<SubscriptionId>, DomainError> {
        let sql = format!(
            "SELECT id FROM subscriptions \
             WHERE (end_date AT TIME ZONE 'UTC')::date <= $1 \
               AND ((state = 'active' AND id IN ({})) OR state = 'cancelled') \
             ORDER BY created",
            FAILING_SUBSCRIPTIONS
        );
        self.subscription_ids(&sql, today, policy).await
    }

    async fn pre_active_subscriptions(&self) -> Result<Vec<SubscriptionId>, DomainError> {
        self.subscriptions_in_state("pre_active").await
    }

    async fn subscriptions_to_deactivate(&self) -> Result<Vec<SubscriptionId>, DomainError> {
        self.subscriptions_in_state("to_deactivate").await
    }

    async fn pending_orders(&self) -> Result<Vec<OrderId>, DomainError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM orders WHERE state IN ('draft', 'processing') ORDER BY created",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to query pending orders"))?;

        Ok(ids.into_iter().map(OrderId::from_uuid).collect())
    }

    async fn abandoned_orders(&self, cutoff: Timestamp) -> Result<Vec<OrderId>, DomainError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM orders \
             WHERE state IN ('draft', 'processing') AND created < $1 \
             ORDER BY created",
        )
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to query abandoned orders"))?;

        Ok(ids.into_iter().map(OrderId::from_uuid).collect())
    }
}
