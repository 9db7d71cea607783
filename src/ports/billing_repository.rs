//! Billing repository port.
//!
//! Reads return fully resolved value objects so handlers never trigger I/O
//! through field access. Writes go through a [`BillingTransaction`]: one
//! transaction per reconciliation operation, opened only after the gateway
//! or entitlement call returned.
//!
//! # Uniqueness backstops
//!
//! Implementations must reject (with `ErrorCode::Conflict`) writes that
//! would leave a user with:
//! - two subscriptions in `active`/`pre_active`
//! - two default payment methods
//! - two outstanding (`draft`/`processing`) manual purchase orders

use async_trait::async_trait;

use crate::domain::billing::{Order, PaymentMethod, Product, Subscription};
use crate::domain::foundation::{DomainError, OrderId, ProductId, SubscriptionId, UserId};

/// Subscription with its product.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionDetails {
    pub subscription: Subscription,
    pub product: Product,
}

/// Order with every record it references.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: Order,
    pub product: Product,
    pub subscription: Subscription,
    pub payment_method: Option<PaymentMethod>,
}

#[async_trait]
pub trait BillingRepository: Send + Sync {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, DomainError>;

    /// Products currently on sale, cheapest first.
    async fn list_active_products(&self) -> Result<Vec<Product>, DomainError>;

    async fn find_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<SubscriptionDetails>, DomainError>;

    /// The user's `active`/`pre_active` subscription, if any.
    async fn find_current_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionDetails>, DomainError>;

    async fn find_order(&self, id: &OrderId) -> Result<Option<OrderDetails>, DomainError>;

    /// The user's outstanding manual purchase order, if any.
    async fn find_unpaid_order(&self, user_id: &UserId) -> Result<Option<Order>, DomainError>;

    /// Most recent paid, non-refund order of a subscription.
    async fn find_last_paid_order(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Order>, DomainError>;

    async fn find_default_payment_method(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PaymentMethod>, DomainError>;

    /// All saved methods of a user, default first.
    async fn list_payment_methods(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, DomainError>;

    /// Opens a unit of work.
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError>;
}

/// Unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait BillingTransaction: Send {
    /// True if the user holds an `active`/`pre_active` subscription.
    async fn has_current_subscription(&mut self, user_id: &UserId) -> Result<bool, DomainError>;

    async fn find_unpaid_order(&mut self, user_id: &UserId) -> Result<Option<Order>, DomainError>;

    /// Re-reads a subscription, locking it until commit.
    async fn lock_subscription(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Re-reads an order, locking it until commit.
    async fn lock_order(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    async fn insert_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn update_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), DomainError>;

    async fn update_order(&mut self, order: &Order) -> Result<(), DomainError>;

    /// Stores `method` as the user's only default.
    ///
    /// A method with the same `external_id` is reused instead of inserted;
    /// every other method of the user is demoted. Returns the stored row.
    async fn save_default_payment_method(
        &mut self,
        method: &PaymentMethod,
    ) -> Result<PaymentMethod, DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
