//! In-memory billing store.
//!
//! Backs tests and local runs without PostgreSQL. A transaction works on a
//! private copy of the tables; commit replays the rows it touched onto the
//! shared tables and enforces the same uniqueness rules as the SQL indexes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::billing::{
    promote_default, Order, OrderState, PaymentMethod, Product, Subscription, SubscriptionState,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PaymentMethodId, ProductId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{
    BillingRepository, BillingTransaction, FailedChargePolicy, OrderDetails, SubscriptionDetails,
    SweepQueries,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    orders: HashMap<OrderId, Order>,
    payment_methods: HashMap<PaymentMethodId, PaymentMethod>,
}

impl Tables {
    fn subscription_details(&self, subscription: &Subscription) -> Result<SubscriptionDetails, DomainError> {
        let product = self.product(&subscription.product_id)?;
        Ok(SubscriptionDetails {
            subscription: subscription.clone(),
            product,
        })
    }

    fn product(&self, id: &ProductId) -> Result<Product, DomainError> {
        self.products
            .get(id)
            .cloned()
            .ok_or_else(|| dangling("product", id.to_string()))
    }

    fn unpaid_order(&self, user_id: &UserId) -> Option<Order> {
        self.orders
            .values()
            .filter(|o| &o.user_id == user_id && o.is_purchase() && o.state.is_outstanding())
            .max_by_key(|o| o.created_at)
            .cloned()
    }

    /// Automatic charges of `subscription_id` that failed inside the window.
    fn recent_failures(&self, subscription_id: &SubscriptionId, since: Timestamp) -> u32 {
        let count = self
            .orders
            .values()
            .filter(|o| {
                &o.subscription_id == subscription_id
                    && o.is_automatic
                    && o.state == OrderState::Error
                    && since.is_before(&o.created_at)
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn check_unique(&self) -> Result<(), DomainError> {
        let mut current = HashSet::new();
        for sub in self.subscriptions.values().filter(|s| s.state.is_current()) {
            if !current.insert(&sub.user_id) {
                return Err(DomainError::conflict("user already has a current subscription")
                    .with_detail("user_id", sub.user_id.as_str()));
            }
        }

        let mut defaults = HashSet::new();
        for method in self.payment_methods.values().filter(|m| m.is_default) {
            if !defaults.insert(&method.user_id) {
                return Err(DomainError::conflict("user already has a default payment method")
                    .with_detail("user_id", method.user_id.as_str()));
            }
        }

        let mut outstanding = HashSet::new();
        for order in self
            .orders
            .values()
            .filter(|o| o.is_purchase() && o.state.is_outstanding())
        {
            if !outstanding.insert(&order.user_id) {
                return Err(DomainError::conflict("user already has an outstanding order")
                    .with_detail("user_id", order.user_id.as_str()));
            }
        }

        Ok(())
    }

    fn sorted_subscriptions<F>(&self, predicate: F) -> Vec<SubscriptionId>
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut matching: Vec<_> = self.subscriptions.values().filter(|s| predicate(s)).collect();
        matching.sort_by_key(|s| s.created_at);
        matching.into_iter().map(|s| s.id).collect()
    }

    fn sorted_orders<F>(&self, predicate: F) -> Vec<OrderId>
    where
        F: Fn(&Order) -> bool,
    {
        let mut matching: Vec<_> = self.orders.values().filter(|o| predicate(o)).collect();
        matching.sort_by_key(|o| o.created_at);
        matching.into_iter().map(|o| o.id).collect()
    }
}

fn dangling(entity: &str, id: String) -> DomainError {
    DomainError::database(format!("{} {} referenced but missing", entity, id))
}

fn not_found(entity: &str, id: String) -> DomainError {
    DomainError::new(ErrorCode::NotFound, format!("{} {} not found", entity, id))
}

/// In-memory implementation of [`BillingRepository`] and [`SweepQueries`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryBillingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Seeding
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn add_product(&self, product: Product) {
        self.tables.write().await.products.insert(product.id, product);
    }

    /// Stores a subscription as-is, bypassing transaction checks.
    pub async fn put_subscription(&self, subscription: Subscription) {
        self.tables
            .write()
            .await
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub async fn put_order(&self, order: Order) {
        self.tables.write().await.orders.insert(order.id, order);
    }

    pub async fn put_payment_method(&self, method: PaymentMethod) {
        self.tables
            .write()
            .await
            .payment_methods
            .insert(method.id, method);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub async fn subscription(&self, id: &SubscriptionId) -> Option<Subscription> {
        self.tables.read().await.subscriptions.get(id).cloned()
    }

    pub async fn order(&self, id: &OrderId) -> Option<Order> {
        self.tables.read().await.orders.get(id).cloned()
    }

    /// Orders of a subscription, oldest first.
    pub async fn orders_of(&self, subscription_id: &SubscriptionId) -> Vec<Order> {
        let tables = self.tables.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| &o.subscription_id == subscription_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    pub async fn subscriptions_of(&self, user_id: &UserId) -> Vec<Subscription> {
        let tables = self.tables.read().await;
        let mut subs: Vec<_> = tables
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.created_at);
        subs
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl BillingRepository for InMemoryBillingRepository {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.tables.read().await.products.get(id).cloned())
    }

    async fn list_active_products(&self) -> Result<Vec<Product>, DomainError> {
        let tables = self.tables.read().await;
        let mut products: Vec<_> = tables.products.values().filter(|p| p.active).cloned().collect();
        products.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(products)
    }

    async fn find_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<SubscriptionDetails>, DomainError> {
        let tables = self.tables.read().await;
        tables
            .subscriptions
            .get(id)
            .map(|s| tables.subscription_details(s))
            .transpose()
    }

    async fn find_current_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionDetails>, DomainError> {
        let tables = self.tables.read().await;
        tables
            .subscriptions
            .values()
            .find(|s| &s.user_id == user_id && s.state.is_current())
            .map(|s| tables.subscription_details(s))
            .transpose()
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<OrderDetails>, DomainError> {
        let tables = self.tables.read().await;
        let Some(order) = tables.orders.get(id) else {
            return Ok(None);
        };

        let subscription = tables
            .subscriptions
            .get(&order.subscription_id)
            .cloned()
            .ok_or_else(|| dangling("subscription", order.subscription_id.to_string()))?;
        let payment_method = order
            .payment_method_id
            .and_then(|pm| tables.payment_methods.get(&pm).cloned());

        Ok(Some(OrderDetails {
            order: order.clone(),
            product: tables.product(&order.product_id)?,
            subscription,
            payment_method,
        }))
    }

    async fn find_unpaid_order(&self, user_id: &UserId) -> Result<Option<Order>, DomainError> {
        Ok(self.tables.read().await.unpaid_order(user_id))
    }

    async fn find_last_paid_order(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Order>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| {
                &o.subscription_id == subscription_id && o.state == OrderState::Paid && !o.is_refund
            })
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn find_default_payment_method(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PaymentMethod>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .payment_methods
            .values()
            .find(|m| &m.user_id == user_id && m.is_default)
            .cloned())
    }

    async fn list_payment_methods(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, DomainError> {
        let tables = self.tables.read().await;
        let mut methods: Vec<_> = tables
            .payment_methods
            .values()
            .filter(|m| &m.user_id == user_id)
            .cloned()
            .collect();
        methods.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(methods)
    }

    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        let working = self.tables.read().await.clone();
        Ok(Box::new(InMemoryTransaction {
            shared: Arc::clone(&self.tables),
            working,
            touched: Touched::default(),
        }))
    }
}

#[derive(Default)]
struct Touched {
    subscriptions: HashSet<SubscriptionId>,
    orders: HashSet<OrderId>,
    payment_methods: HashSet<PaymentMethodId>,
}

struct InMemoryTransaction {
    shared: Arc<RwLock<Tables>>,
    working: Tables,
    touched: Touched,
}

#[async_trait]
impl BillingTransaction for InMemoryTransaction {
    async fn has_current_subscription(&mut self, user_id: &UserId) -> Result<bool, DomainError> {
        Ok(self
            .working
            .subscriptions
            .values()
            .any(|s| &s.user_id == user_id && s.state.is_current()))
    }

    async fn find_unpaid_order(&mut self, user_id: &UserId) -> Result<Option<Order>, DomainError> {
        Ok(self.working.unpaid_order(user_id))
    }

    async fn lock_subscription(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.working.subscriptions.get(id).cloned())
    }

    async fn lock_order(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.working.orders.get(id).cloned())
    }

    async fn insert_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        if self.working.subscriptions.contains_key(&subscription.id) {
            return Err(DomainError::conflict(format!(
                "subscription {} already exists",
                subscription.id
            )));
        }
        self.working
            .subscriptions
            .insert(subscription.id, subscription.clone());
        self.touched.subscriptions.insert(subscription.id);
        Ok(())
    }

    async fn update_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        let row = self
            .working
            .subscriptions
            .get_mut(&subscription.id)
            .ok_or_else(|| not_found("subscription", subscription.id.to_string()))?;
        *row = subscription.clone();
        self.touched.subscriptions.insert(subscription.id);
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        if self.working.orders.contains_key(&order.id) {
            return Err(DomainError::conflict(format!("order {} already exists", order.id)));
        }
        self.working.orders.insert(order.id, order.clone());
        self.touched.orders.insert(order.id);
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let row = self
            .working
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| not_found("order", order.id.to_string()))?;
        *row = order.clone();
        self.touched.orders.insert(order.id);
        Ok(())
    }

    async fn save_default_payment_method(
        &mut self,
        method: &PaymentMethod,
    ) -> Result<PaymentMethod, DomainError> {
        let mut owned: Vec<PaymentMethod> = self
            .working
            .payment_methods
            .values()
            .filter(|m| m.user_id == method.user_id)
            .cloned()
            .collect();

        let stored_id = match owned.iter().find(|m| m.external_id == method.external_id) {
            Some(existing) => existing.id,
            None => {
                owned.push(method.clone());
                self.touched.payment_methods.insert(method.id);
                method.id
            }
        };

        for id in promote_default(&mut owned, &method.external_id, method.modified_at) {
            self.touched.payment_methods.insert(id);
        }
        for row in owned {
            self.working.payment_methods.insert(row.id, row);
        }

        self.working
            .payment_methods
            .get(&stored_id)
            .cloned()
            .ok_or_else(|| dangling("payment method", stored_id.to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut shared = self.shared.write().await;
        let mut candidate = shared.clone();

        for id in &self.touched.subscriptions {
            if let Some(row) = self.working.subscriptions.get(id) {
                candidate.subscriptions.insert(*id, row.clone());
            }
        }
        for id in &self.touched.orders {
            if let Some(row) = self.working.orders.get(id) {
                candidate.orders.insert(*id, row.clone());
            }
        }
        for id in &self.touched.payment_methods {
            if let Some(row) = self.working.payment_methods.get(id) {
                candidate.payment_methods.insert(*id, row.clone());
            }
        }

        candidate.check_unique()?;
        *shared = candidate;
        Ok(())
    }
}

#[async_trait]
impl SweepQueries for InMemoryBillingRepository {
    async fn renewable_subscriptions(
        &self,
        today: NaiveDate,
        policy: FailedChargePolicy,
    ) -> Result<Vec<SubscriptionId>, DomainError> {
        let tables = self.tables.read().await;
        let since = policy.window_start(today);
        Ok(tables.sorted_subscriptions(|s| {
            s.state == SubscriptionState::Active
                && s.is_due(today)
                && tables.recent_failures(&s.id, since) < policy.threshold
        }))
    }

    async fn overdue_subscriptions(
        &self,
        today: NaiveDate,
        policy: FailedChargePolicy,
    ) -> Result<Vec<SubscriptionId>, DomainError> {
        let tables = self.tables.read().await;
        let since = policy.window_start(today);
        Ok(tables.sorted_subscriptions(|s| {
            let due = s.is_due(today);
            match s.state {
                SubscriptionState::Active => {
                    due && tables.recent_failures(&s.id, since) >= policy.threshold
                }
                SubscriptionState::Cancelled => due,
                _ => false,
            }
        }))
    }

    async fn pre_active_subscriptions(&self) -> Result<Vec<SubscriptionId>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.sorted_subscriptions(|s| s.state == SubscriptionState::PreActive))
    }

    async fn subscriptions_to_deactivate(&self) -> Result<Vec<SubscriptionId>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.sorted_subscriptions(|s| s.state == SubscriptionState::ToDeactivate))
    }

    async fn pending_orders(&self) -> Result<Vec<OrderId>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.sorted_orders(|o| o.state.is_outstanding()))
    }

    async fn abandoned_orders(&self, cutoff: Timestamp) -> Result<Vec<OrderId>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.sorted_orders(|o| o.state.is_outstanding() && o.created_at.is_before(&cutoff)))
    }
}
