//! Billing error taxonomy.
//!
//! Every rejection a reconciliation operation can produce, with a stable
//! machine-readable code.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ProductNotFound, OrderNotFound, SubscriptionNotFound | 404 |
//! | ActiveSubscriptionNotFound, PaidOrderNotFound, NoUnpaidOrder | 404 |
//! | PaymentMethodNotFound, EntitlementTargetNotFound | 404 |
//! | UserHasSubscription, UserHasProcessingOrder, UserHasDraftOrder | 409 |
//! | OrderAlreadyPaid, OrderSettled, InvalidState | 409 |
//! | ProductInactive, SubscriptionExpired, UnsupportedPaymentSystem | 400 |
//! | ValidationFailed | 400 |
//! | Gateway, Entitlement | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, ProductId, SubscriptionId, UserId, ValidationError,
};

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    ProductNotFound(ProductId),
    OrderNotFound(OrderId),
    SubscriptionNotFound(SubscriptionId),

    /// User has no `active`/`pre_active` subscription.
    ActiveSubscriptionNotFound(UserId),

    /// No paid purchase order backs the subscription.
    PaidOrderNotFound(SubscriptionId),

    /// User has no draft or processing purchase order.
    NoUnpaidOrder(UserId),

    /// No default payment method to charge.
    PaymentMethodNotFound(UserId),

    /// Role service does not know the user or the role.
    EntitlementTargetNotFound { user_id: UserId, role_id: String },

    UserHasSubscription(UserId),
    UserHasProcessingOrder(UserId),
    UserHasDraftOrder(UserId),
    OrderAlreadyPaid(OrderId),

    /// Order already ended in `error`.
    OrderSettled(OrderId),

    /// Requested transition is not legal from the current state.
    InvalidState { entity: String, from: String, to: String },

    ProductInactive(ProductId),

    /// Subscription window already closed; nothing to refund.
    SubscriptionExpired(SubscriptionId),

    UnsupportedPaymentSystem(String),

    ValidationFailed { field: String, message: String },

    /// Payment gateway call failed.
    Gateway { message: String, retryable: bool },

    /// Role service call failed.
    Entitlement(String),

    Infrastructure(String),
}

impl BillingError {
    pub fn invalid_state(
        entity: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        BillingError::InvalidState {
            entity: entity.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn gateway(message: impl Into<String>, retryable: bool) -> Self {
        BillingError::Gateway {
            message: message.into(),
            retryable,
        }
    }

    pub fn entitlement(message: impl Into<String>) -> Self {
        BillingError::Entitlement(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Stable code carried in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            BillingError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            BillingError::SubscriptionNotFound(_) => "SUBSCRIPTION_NOT_FOUND",
            BillingError::ActiveSubscriptionNotFound(_) => "ACTIVE_SUBSCRIPTION_NOT_FOUND",
            BillingError::PaidOrderNotFound(_) => "PAID_ORDER_NOT_FOUND",
            BillingError::NoUnpaidOrder(_) => "NO_UNPAID_ORDER",
            BillingError::PaymentMethodNotFound(_) => "PAYMENT_METHOD_NOT_FOUND",
            BillingError::EntitlementTargetNotFound { .. } => "USER_OR_ROLE_NOT_FOUND",
            BillingError::UserHasSubscription(_) => "USER_HAS_SUBSCRIPTION",
            BillingError::UserHasProcessingOrder(_) => "USER_HAS_PROCESSING_ORDER",
            BillingError::UserHasDraftOrder(_) => "USER_HAS_DRAFT_ORDER",
            BillingError::OrderAlreadyPaid(_) => "ORDER_IS_PAID",
            BillingError::OrderSettled(_) => "ORDER_IS_SETTLED",
            BillingError::InvalidState { .. } => "INVALID_STATE_TRANSITION",
            BillingError::ProductInactive(_) => "INACTIVE_PRODUCT",
            BillingError::SubscriptionExpired(_) => "SUBSCRIPTION_EXPIRED",
            BillingError::UnsupportedPaymentSystem(_) => "UNSUPPORTED_PAYMENT_SYSTEM",
            BillingError::ValidationFailed { .. } => "VALIDATION_FAILED",
            BillingError::Gateway { .. } => "PAYMENT_GATEWAY_ERROR",
            BillingError::Entitlement(_) => "ENTITLEMENT_SERVICE_ERROR",
            BillingError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::ProductNotFound(id) => format!("Product {} not found", id),
            BillingError::OrderNotFound(id) => format!("Order {} not found", id),
            BillingError::SubscriptionNotFound(id) => format!("Subscription {} not found", id),
            BillingError::ActiveSubscriptionNotFound(_) => {
                "User has no active subscription".to_string()
            }
            BillingError::PaidOrderNotFound(id) => {
                format!("No paid order found for subscription {}", id)
            }
            BillingError::NoUnpaidOrder(_) => "User has no unpaid orders".to_string(),
            BillingError::PaymentMethodNotFound(_) => {
                "User has no default payment method".to_string()
            }
            BillingError::EntitlementTargetNotFound { user_id, role_id } => {
                format!("User {} or role {} not found", user_id, role_id)
            }
            BillingError::UserHasSubscription(_) => {
                "User already has an active subscription".to_string()
            }
            BillingError::UserHasProcessingOrder(_) => {
                "User already has an order in process".to_string()
            }
            BillingError::UserHasDraftOrder(_) => {
                "User has a draft order, complete or abandon it first".to_string()
            }
            BillingError::OrderAlreadyPaid(id) => format!("Order {} is already paid", id),
            BillingError::OrderSettled(id) => format!("Order {} is already closed", id),
            BillingError::InvalidState { entity, from, to } => {
                format!("Cannot move {} from {} to {}", entity, from, to)
            }
            BillingError::ProductInactive(id) => format!("Product {} is not on sale", id),
            BillingError::SubscriptionExpired(id) => {
                format!("Subscription {} has already expired", id)
            }
            BillingError::UnsupportedPaymentSystem(name) => {
                format!("Payment system '{}' is not supported", name)
            }
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Gateway { message, .. } => format!("Payment gateway error: {}", message),
            BillingError::Entitlement(msg) => format!("Entitlement service error: {}", msg),
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::Gateway { retryable, .. } => *retryable,
            BillingError::Entitlement(_) | BillingError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => BillingError::InvalidState {
                entity: "record".to_string(),
                from: "unknown".to_string(),
                to: err.message,
            },
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => {
                BillingError::validation("request", err.message)
            }
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidTransition { entity, from, to } => {
                BillingError::invalid_state(entity, from, to)
            }
            ValidationError::EmptyField { field } => {
                BillingError::validation(field, "must not be empty")
            }
            ValidationError::InvalidFormat { field, reason } => BillingError::validation(field, reason),
        }
    }
}
