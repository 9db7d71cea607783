//! Shared fixtures for the billing handler tests.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use crate::adapters::entitlement::MockEntitlementService;
use crate::adapters::memory::InMemoryBillingRepository;
use crate::adapters::stripe::MockPaymentGateway;
use crate::application::GatewayRegistry;
use crate::domain::billing::{
    Order, OrderState, PaymentMethod, PaymentSystem, Product, Subscription, SubscriptionState,
};
use crate::domain::foundation::{ProductId, Timestamp, UserId};

pub(crate) fn user() -> UserId {
    UserId::new("user-1").unwrap()
}

pub(crate) fn product(period_days: u32, price: &str) -> Product {
    let now = Timestamp::now();
    Product {
        id: ProductId::new(),
        name: "Premium".to_string(),
        description: "Premium plan".to_string(),
        price: Decimal::from_str(price).unwrap(),
        currency_code: "USD".to_string(),
        period_days,
        role_id: "premium".to_string(),
        active: true,
        created_at: now,
        modified_at: now,
    }
}

pub(crate) struct Fixture {
    pub repo: InMemoryBillingRepository,
    pub gateway: MockPaymentGateway,
    pub entitlements: MockEntitlementService,
    pub registry: GatewayRegistry,
}

impl Fixture {
    pub fn new() -> Self {
        let gateway = MockPaymentGateway::new();
        Self {
            repo: InMemoryBillingRepository::new(),
            registry: GatewayRegistry::new().with_gateway(Arc::new(gateway.clone())),
            gateway,
            entitlements: MockEntitlementService::new(),
        }
    }

    pub fn repository(&self) -> Arc<InMemoryBillingRepository> {
        Arc::new(self.repo.clone())
    }

    pub fn entitlement_service(&self) -> Arc<MockEntitlementService> {
        Arc::new(self.entitlements.clone())
    }

    pub async fn add_product(&self, period_days: u32, price: &str) -> Product {
        let product = product(period_days, price);
        self.repo.add_product(product.clone()).await;
        product
    }

    /// A subscription in `state` whose window ends `days_left` days from now,
    /// paid for by a settled purchase on a default card.
    pub async fn paid_subscription(
        &self,
        product: &Product,
        state: SubscriptionState,
        days_left: i64,
    ) -> (Subscription, Order, PaymentMethod) {
        let now = Timestamp::now();
        let mut subscription = Subscription::new(user(), product.id, now);
        subscription.state = state;
        subscription.start_date = now.add_days(days_left - i64::from(product.period_days));
        subscription.end_date = now.add_days(days_left);

        let method = PaymentMethod::new_default(
            user(),
            "pm_card_visa",
            PaymentSystem::Stripe,
            "card",
            json!({"brand": "visa", "last4": "4242"}),
            now,
        );

        // Registered with the mock gateway so refunds against it succeed.
        let payment = {
            use crate::ports::PaymentGateway;
            self.gateway.create_payment(user().as_str(), 1, "usd").await.unwrap()
        };

        let mut order = Order::purchase(
            user(),
            "user@example.com",
            product,
            subscription.id,
            PaymentSystem::Stripe,
            now.minus_days(i64::from(product.period_days) - days_left),
        );
        order.external_id = Some(payment.id);
        order.state = OrderState::Paid;
        order.payment_method_id = Some(method.id);

        self.repo.put_subscription(subscription.clone()).await;
        self.repo.put_payment_method(method.clone()).await;
        self.repo.put_order(order.clone()).await;
        (subscription, order, method)
    }
}
