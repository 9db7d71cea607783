//! PostgreSQL implementation of BillingRepository.
//!
//! Reads go straight to the pool. Writes run inside a
//! [`PostgresBillingTransaction`]; `lock_*` re-reads rows with
//! `SELECT ... FOR UPDATE` so concurrent operations on the same record
//! serialize. The partial unique indexes of the migration back the
//! one-per-user rules and surface as `ErrorCode::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{
    Order, OrderState, PaymentMethod, PaymentSystem, Product, Subscription, SubscriptionState,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PaymentMethodId, ProductId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{BillingRepository, BillingTransaction, OrderDetails, SubscriptionDetails};

pub(super) const PRODUCT_COLUMNS: &str =
    "id, name, description, price, currency_code, period, role_id, active, created, modified";

pub(super) const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, product_id, start_date, end_date, state, created, modified";

const PAYMENT_METHOD_COLUMNS: &str =
    "id, user_id, external_id, payment_system, type, is_default, data, created, modified";

const ORDER_COLUMNS: &str = "id, external_id, user_id, user_email, product_id, subscription_id, \
     payment_method_id, payment_system, payment_amount, payment_currency_code, state, \
     is_automatic, is_refund, src_order_id, created, modified";

/// PostgreSQL implementation of the BillingRepository port.
#[derive(Clone)]
pub struct PostgresBillingRepository {
    pool: PgPool,
}

impl PostgresBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Rows
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    currency_code: String,
    period: i32,
    role_id: String,
    active: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DomainError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            currency_code: row.currency_code,
            period_days: u32::try_from(row.period)
                .map_err(|_| corrupt("products.period", row.period))?,
            role_id: row.role_id,
            active: row.active,
            created_at: Timestamp::from_datetime(row.created),
            modified_at: Timestamp::from_datetime(row.modified),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    product_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    state: String,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: parse_user_id(row.user_id)?,
            product_id: ProductId::from_uuid(row.product_id),
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            state: row
                .state
                .parse::<SubscriptionState>()
                .map_err(|_| corrupt("subscriptions.state", &row.state))?,
            created_at: Timestamp::from_datetime(row.created),
            modified_at: Timestamp::from_datetime(row.modified),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentMethodRow {
    id: Uuid,
    user_id: String,
    external_id: String,
    payment_system: String,
    #[sqlx(rename = "type")]
    method_type: String,
    is_default: bool,
    data: serde_json::Value,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl TryFrom<PaymentMethodRow> for PaymentMethod {
    type Error = DomainError;

    fn try_from(row: PaymentMethodRow) -> Result<Self, Self::Error> {
        Ok(PaymentMethod {
            id: PaymentMethodId::from_uuid(row.id),
            user_id: parse_user_id(row.user_id)?,
            external_id: row.external_id,
            payment_system: parse_payment_system(&row.payment_system)?,
            method_type: row.method_type,
            is_default: row.is_default,
            display_data: row.data,
            created_at: Timestamp::from_datetime(row.created),
            modified_at: Timestamp::from_datetime(row.modified),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    external_id: Option<String>,
    user_id: String,
    user_email: String,
    product_id: Uuid,
    subscription_id: Uuid,
    payment_method_id: Option<Uuid>,
    payment_system: String,
    payment_amount: Decimal,
    payment_currency_code: String,
    state: String,
    is_automatic: bool,
    is_refund: bool,
    src_order_id: Option<Uuid>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            external_id: row.external_id,
            user_id: parse_user_id(row.user_id)?,
            user_email: row.user_email,
            product_id: ProductId::from_uuid(row.product_id),
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            payment_method_id: row.payment_method_id.map(PaymentMethodId::from_uuid),
            payment_system: parse_payment_system(&row.payment_system)?,
            payment_amount: row.payment_amount,
            payment_currency_code: row.payment_currency_code,
            state: row
                .state
                .parse::<OrderState>()
                .map_err(|_| corrupt("orders.state", &row.state))?,
            is_automatic: row.is_automatic,
            is_refund: row.is_refund,
            src_order_id: row.src_order_id.map(OrderId::from_uuid),
            created_at: Timestamp::from_datetime(row.created),
            modified_at: Timestamp::from_datetime(row.modified),
        })
    }
}

fn parse_user_id(raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| corrupt("user_id", e))
}

fn parse_payment_system(raw: &str) -> Result<PaymentSystem, DomainError> {
    raw.parse().map_err(|_| corrupt("payment_system", raw))
}

fn corrupt(field: &str, value: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", field, value),
    )
}

/// Maps a sqlx failure, turning unique violations into conflicts.
pub(super) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return DomainError::conflict(format!("{}: {} violated", context, constraint))
                    .with_detail("constraint", constraint);
            }
        }
        DomainError::database(format!("{}: {}", context, e))
    }
}

fn rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, DomainError>
where
    T: TryFrom<R, Error = DomainError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Reads
// ════════════════════════════════════════════════════════════════════════════

impl PostgresBillingRepository {
    async fn product_by_id(&self, id: Uuid) -> Result<Product, DomainError> {
        let row: ProductRow = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to load product"))?;
        row.try_into()
    }

    async fn with_product(&self, row: SubscriptionRow) -> Result<SubscriptionDetails, DomainError> {
        let product = self.product_by_id(row.product_id).await?;
        Ok(SubscriptionDetails {
            subscription: row.try_into()?,
            product,
        })
    }
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find product"))?;

        row.map(Product::try_from).transpose()
    }

    async fn list_active_products(&self) -> Result<Vec<Product>, DomainError> {
        let found: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE active ORDER BY price, name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list products"))?;

        rows(found)
    }

    async fn find_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<SubscriptionDetails>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find subscription"))?;

        match row {
            Some(row) => Ok(Some(self.with_product(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_current_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionDetails>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions \
             WHERE user_id = $1 AND state IN ('active', 'pre_active')",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find current subscription"))?;

        match row {
            Some(row) => Ok(Some(self.with_product(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<OrderDetails>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find order"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = Order::try_from(row)?;

        let subscription: SubscriptionRow = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(order.subscription_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to load order subscription"))?;

        let payment_method = match order.payment_method_id {
            Some(pm_id) => {
                let row: Option<PaymentMethodRow> = sqlx::query_as(&format!(
                    "SELECT {} FROM payment_methods WHERE id = $1",
                    PAYMENT_METHOD_COLUMNS
                ))
                .bind(pm_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to load order payment method"))?;
                row.map(PaymentMethod::try_from).transpose()?
            }
            None => None,
        };

        Ok(Some(OrderDetails {
            product: self.product_by_id(*order.product_id.as_uuid()).await?,
            subscription: subscription.try_into()?,
            payment_method,
            order,
        }))
    }

    async fn find_unpaid_order(&self, user_id: &UserId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders \
             WHERE user_id = $1 AND state IN ('draft', 'processing') \
               AND NOT is_automatic AND NOT is_refund \
             ORDER BY created DESC LIMIT 1",
            ORDER_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find unpaid order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_last_paid_order(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders \
             WHERE subscription_id = $1 AND state = 'paid' AND NOT is_refund \
             ORDER BY created DESC LIMIT 1",
            ORDER_COLUMNS
        ))
        .bind(subscription_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find paid order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_default_payment_method(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PaymentMethod>, DomainError> {
        let row: Option<PaymentMethodRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_methods WHERE user_id = $1 AND is_default",
            PAYMENT_METHOD_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find default payment method"))?;

        row.map(PaymentMethod::try_from).transpose()
    }

    async fn list_payment_methods(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, DomainError> {
        let found: Vec<PaymentMethodRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_methods WHERE user_id = $1 \
             ORDER BY is_default DESC, created",
            PAYMENT_METHOD_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list payment methods"))?;

        rows(found)
    }

    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        Ok(Box::new(PostgresBillingTransaction { tx }))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Unit of work
// ════════════════════════════════════════════════════════════════════════════

/// One database transaction; rolled back on drop unless committed.
pub struct PostgresBillingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingTransaction for PostgresBillingTransaction {
    async fn has_current_subscription(&mut self, user_id: &UserId) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM subscriptions \
             WHERE user_id = $1 AND state IN ('active', 'pre_active'))",
        )
        .bind(user_id.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("Failed to check current subscription"))?;

        Ok(exists)
    }

    async fn find_unpaid_order(&mut self, user_id: &UserId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders \
             WHERE user_id = $1 AND state IN ('draft', 'processing') \
               AND NOT is_automatic AND NOT is_refund \
             ORDER BY created DESC LIMIT 1",
            ORDER_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to find unpaid order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn lock_subscription(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to lock subscription"))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn lock_order(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("Failed to lock order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn insert_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, product_id, start_date, end_date, state, created, modified
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.product_id.as_uuid())
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.state.as_str())
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.modified_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to insert subscription"))?;

        Ok(())
    }

    async fn update_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                start_date = $2,
                end_date = $3,
                state = $4,
                modified = $5
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.state.as_str())
        .bind(subscription.modified_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to update subscription"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::NotFound,
                format!("Subscription {} not found", subscription.id),
            ));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, external_id, user_id, user_email, product_id, subscription_id,
                payment_method_id, payment_system, payment_amount, payment_currency_code,
                state, is_automatic, is_refund, src_order_id, created, modified
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.external_id)
        .bind(order.user_id.as_str())
        .bind(&order.user_email)
        .bind(order.product_id.as_uuid())
        .bind(order.subscription_id.as_uuid())
        .bind(order.payment_method_id.map(|id| *id.as_uuid()))
        .bind(order.payment_system.as_str())
        .bind(order.payment_amount)
        .bind(&order.payment_currency_code)
        .bind(order.state.as_str())
        .bind(order.is_automatic)
        .bind(order.is_refund)
        .bind(order.src_order_id.map(|id| *id.as_uuid()))
        .bind(order.created_at.as_datetime())
        .bind(order.modified_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to insert order"))?;

        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                external_id = $2,
                payment_method_id = $3,
                state = $4,
                modified = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.external_id)
        .bind(order.payment_method_id.map(|id| *id.as_uuid()))
        .bind(order.state.as_str())
        .bind(order.modified_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to update order"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::NotFound,
                format!("Order {} not found", order.id),
            ));
        }
        Ok(())
    }

    async fn save_default_payment_method(
        &mut self,
        method: &PaymentMethod,
    ) -> Result<PaymentMethod, DomainError> {
        // Demote first: the partial unique index is checked per statement.
        sqlx::query(
            r#"
            UPDATE payment_methods SET is_default = FALSE, modified = $3
            WHERE user_id = $1 AND is_default AND external_id <> $2
            "#,
        )
        .bind(method.user_id.as_str())
        .bind(&method.external_id)
        .bind(method.modified_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("Failed to demote payment methods"))?;

        let row: PaymentMethodRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO payment_methods (
                id, user_id, external_id, payment_system, type, is_default, data, created, modified
            ) VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8)
            ON CONFLICT (user_id, external_id) DO UPDATE SET
                is_default = TRUE,
                modified = EXCLUDED.modified
            RETURNING {}
            "#,
            PAYMENT_METHOD_COLUMNS
        ))
        .bind(method.id.as_uuid())
        .bind(method.user_id.as_str())
        .bind(&method.external_id)
        .bind(method.payment_system.as_str())
        .bind(&method.method_type)
        .bind(&method.display_data)
        .bind(method.created_at.as_datetime())
        .bind(method.modified_at.as_datetime())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error("Failed to save payment method"))?;

        row.try_into()
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(db_error("Failed to commit transaction"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order_row(state: &str) -> OrderRow {
        OrderRow {
            id: Uuid::new_v4(),
            external_id: Some("pi_1".to_string()),
            user_id: "user-1".to_string(),
            user_email: "a@b.c".to_string(),
            product_id: Uuid::new_v4(),
            subscription_id: Uuid::new_v4(),
            payment_method_id: None,
            payment_system: "stripe".to_string(),
            payment_amount: Decimal::new(1000, 2),
            payment_currency_code: "usd".to_string(),
            state: state.to_string(),
            is_automatic: false,
            is_refund: false,
            src_order_id: None,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    #[test]
    fn order_row_converts() {
        let order = Order::try_from(order_row("processing")).unwrap();
        assert_eq!(order.state, OrderState::Processing);
        assert_eq!(order.payment_system, PaymentSystem::Stripe);
        assert_eq!(order.user_id.as_str(), "user-1");
    }

    #[test]
    fn unknown_order_state_is_database_error() {
        let err = Order::try_from(order_row("refunded")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn negative_period_is_rejected() {
        let row = ProductRow {
            id: Uuid::new_v4(),
            name: "Monthly".to_string(),
            description: String::new(),
            price: Decimal::new(1000, 2),
            currency_code: "usd".to_string(),
            period: -1,
            role_id: "subscriber".to_string(),
            active: true,
            created: Utc::now(),
            modified: Utc::now(),
        };
        assert!(Product::try_from(row).is_err());
    }

    #[test]
    fn payment_method_row_keeps_display_data() {
        let row = PaymentMethodRow {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            external_id: "pm_1".to_string(),
            payment_system: "stripe".to_string(),
            method_type: "card".to_string(),
            is_default: true,
            data: json!({"last4": "4242"}),
            created: Utc::now(),
            modified: Utc::now(),
        };

        let method = PaymentMethod::try_from(row).unwrap();

        assert_eq!(method.display_data["last4"], "4242");
        assert!(method.is_default);
    }
}
