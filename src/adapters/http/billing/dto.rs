//! HTTP DTOs for the billing API.
//!
//! These types define the JSON request/response structure of the user and
//! service endpoints. They serve as the boundary between HTTP and the
//! application layer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{PaymentSession, RefundResult, UpdateOrderResult};
use crate::domain::billing::{
    Order, OrderState, PaymentMethod, PaymentSystem, Product, SubscriptionState,
};
use crate::domain::foundation::{OrderId, PaymentMethodId, ProductId, SubscriptionId};
use crate::ports::SubscriptionDetails;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start paying for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub product_id: ProductId,
    /// Receipt address passed to the gateway.
    pub email: String,
    /// Gateway tag, e.g. `stripe`.
    pub payment_system: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Client-side confirmation data of a gateway payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfoResponse {
    pub payment_system: PaymentSystem,
    /// Absent once the payment no longer needs client confirmation.
    pub client_secret: Option<String>,
}

impl From<PaymentSession> for PaymentInfoResponse {
    fn from(session: PaymentSession) -> Self {
        Self {
            payment_system: session.payment_system,
            client_secret: session.client_secret,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency_code: String,
    /// Billing period in days.
    pub period: u32,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            currency_code: product.currency_code,
            period: product.period_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodResponse {
    pub id: PaymentMethodId,
    #[serde(rename = "type")]
    pub method_type: String,
    pub payment_system: PaymentSystem,
    pub is_default: bool,
    /// Display fields, e.g. card brand and last four digits.
    pub data: serde_json::Value,
}

impl From<PaymentMethod> for PaymentMethodResponse {
    fn from(method: PaymentMethod) -> Self {
        Self {
            id: method.id,
            method_type: method.method_type,
            payment_system: method.payment_system,
            is_default: method.is_default,
            data: method.display_data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub product: ProductResponse,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: SubscriptionState,
}

impl From<SubscriptionDetails> for SubscriptionResponse {
    fn from(details: SubscriptionDetails) -> Self {
        Self {
            start_date: details.subscription.start_date.date(),
            end_date: details.subscription.end_date.date(),
            state: details.subscription.state,
            product: details.product.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStateResponse {
    pub subscription_id: SubscriptionId,
    pub state: SubscriptionState,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResponse {
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency_code: String,
    pub state: OrderState,
}

impl From<RefundResult> for RefundResponse {
    fn from(result: RefundResult) -> Self {
        Self {
            order_id: result.refund_order.id,
            amount: result.amount,
            currency_code: result.refund_order.payment_currency_code,
            state: result.refund_order.state,
        }
    }
}

/// Order state after a service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStateResponse {
    pub order_id: OrderId,
    pub state: OrderState,
}

impl From<UpdateOrderResult> for OrderStateResponse {
    fn from(result: UpdateOrderResult) -> Self {
        Self {
            order_id: result.order_id,
            state: result.state,
        }
    }
}

impl From<Order> for OrderStateResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            state: order.state,
        }
    }
}

/// Standard error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
