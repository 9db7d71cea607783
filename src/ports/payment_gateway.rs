//! Payment gateway port - normalized contract over payment providers.
//!
//! Billing never sees provider-specific statuses. Adapters map whatever the
//! provider reports into [`OrderState`], applying the decline policy: a
//! declined manual charge maps to `draft` (the user may retry), a declined
//! automatic charge maps to `error`.
//!
//! Amounts cross this boundary in integer minor units.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingError, OrderState, PaymentSystem};
use crate::domain::foundation::UserId;

/// Provider-agnostic payment gateway.
///
/// Implementations retry transient failures (rate limiting, connection
/// errors) internally; an `Err` means the retries were exhausted or the
/// failure was definitive.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Which payment system this gateway serves.
    fn payment_system(&self) -> PaymentSystem;

    /// Ensures a customer exists for the user and returns its reference.
    async fn create_customer(&self, user_id: &UserId, email: &str) -> Result<String, GatewayError>;

    /// Starts a payment the user still has to confirm client-side.
    async fn create_payment(
        &self,
        customer_ref: &str,
        amount_minor_units: i64,
        currency: &str,
    ) -> Result<GatewayPayment, GatewayError>;

    /// Charges a saved payment method without user interaction.
    async fn create_recurring_payment(
        &self,
        customer_ref: &str,
        amount_minor_units: i64,
        currency: &str,
        payment_method_ref: &str,
    ) -> Result<GatewayPayment, GatewayError>;

    /// Re-reads a payment, including its client secret.
    async fn get_payment(&self, external_id: &str) -> Result<GatewayPayment, GatewayError>;

    async fn get_payment_status(&self, external_id: &str) -> Result<OrderState, GatewayError>;

    /// Instrument used by a settled payment.
    async fn get_payment_method(&self, external_id: &str)
        -> Result<GatewayPaymentMethod, GatewayError>;

    /// Refunds part of a settled payment. Repeating the call for the same
    /// source payment must not pay out twice.
    async fn create_refund(
        &self,
        src_external_id: &str,
        amount_minor_units: i64,
    ) -> Result<GatewayRefund, GatewayError>;

    async fn get_refund_status(&self, external_id: &str) -> Result<OrderState, GatewayError>;
}

/// Payment as seen through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    /// Secret the client app uses to confirm a manual payment.
    pub client_secret: Option<String>,
    pub state: OrderState,
    pub is_automatic: bool,
}

/// Refund as seen through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub state: OrderState,
}

/// Saved instrument as seen through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPaymentMethod {
    pub id: String,
    pub method_type: String,
    /// Display-only fields (brand, last4, expiry).
    pub display_data: serde_json::Value,
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        let retryable = err.is_retryable();
        BillingError::gateway(err.to_string(), retryable)
    }
}

/// Gateway error codes, one per class of HTTP outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// 400: request rejected as malformed.
    BadRequest,

    /// 401: API key rejected.
    Unauthorized,

    /// 402: parameters valid but the request failed (e.g. card declined).
    PaymentRequired,

    /// 403: key lacks permission.
    Forbidden,

    /// 404: unknown resource.
    NotFound,

    /// 409: conflicting request (idempotency key reuse).
    Conflict,

    /// 429: rate limited.
    RateLimited,

    /// 5xx from the provider.
    ProviderError,

    /// Could not reach the provider.
    NetworkError,

    /// Provider answered with a body we could not interpret.
    InvalidResponse,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimited)
    }

    /// Classifies an HTTP error status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => GatewayErrorCode::BadRequest,
            401 => GatewayErrorCode::Unauthorized,
            402 => GatewayErrorCode::PaymentRequired,
            403 => GatewayErrorCode::Forbidden,
            404 => GatewayErrorCode::NotFound,
            409 => GatewayErrorCode::Conflict,
            429 => GatewayErrorCode::RateLimited,
            _ => GatewayErrorCode::ProviderError,
        }
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::BadRequest => "bad_request",
            GatewayErrorCode::Unauthorized => "unauthorized",
            GatewayErrorCode::PaymentRequired => "payment_required",
            GatewayErrorCode::Forbidden => "forbidden",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::Conflict => "conflict",
            GatewayErrorCode::RateLimited => "rate_limited",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_classify() {
        assert_eq!(GatewayErrorCode::from_status(402), GatewayErrorCode::PaymentRequired);
        assert_eq!(GatewayErrorCode::from_status(429), GatewayErrorCode::RateLimited);
        assert_eq!(GatewayErrorCode::from_status(503), GatewayErrorCode::ProviderError);
    }

    #[test]
    fn only_rate_limit_and_network_retry() {
        assert!(GatewayError::network("reset").is_retryable());
        assert!(GatewayError::new(GatewayErrorCode::RateLimited, "slow down").is_retryable());
        assert!(!GatewayError::not_found("payment_intent").is_retryable());
        assert!(!GatewayError::new(GatewayErrorCode::Conflict, "dup").is_retryable());
    }

    #[test]
    fn converts_to_billing_gateway_error() {
        let err: BillingError = GatewayError::network("timeout").into();
        assert_eq!(err, BillingError::gateway("network_error: timeout", true));
    }

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _assert_object_safe(_: &dyn PaymentGateway) {}
        fn _assert_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_send_sync::<std::sync::Arc<dyn PaymentGateway>>();
    }
}
