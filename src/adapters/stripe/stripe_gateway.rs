//! Stripe payment gateway adapter.
//!
//! Implements `PaymentGateway` over the Stripe REST API using payment
//! intents and refunds.
//!
//! # Request conventions
//!
//! - Form-encoded POSTs authenticated with the secret key
//! - One `Idempotency-Key` per create call, reused across its retries;
//!   refunds are keyed on their source payment
//! - Rate limiting (429) and connection failures are retried with backoff
//! - The Stripe customer id is the billing user id

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::adapters::reliability::{retry_with_backoff, BackoffPolicy};
use crate::domain::billing::{money, OrderState, PaymentSystem};
use crate::domain::foundation::UserId;
use crate::ports::{
    GatewayError, GatewayErrorCode, GatewayPayment, GatewayPaymentMethod, GatewayRefund,
    PaymentGateway,
};

use super::models::{StripeErrorBody, StripeErrorEnvelope, StripePaymentIntent, StripeRefund};
use super::normalize;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL including the version segment.
    api_base_url: String,

    request_timeout: Duration,

    backoff: BackoffPolicy,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com/v1".to_string(),
            request_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Failed Stripe call, keeping the parsed error body for callers that
/// recover from specific failures.
#[derive(Debug)]
struct StripeCallError {
    gateway: GatewayError,
    body: Option<StripeErrorBody>,
}

impl StripeCallError {
    fn is_retryable(&self) -> bool {
        self.gateway.is_retryable()
    }
}

impl std::fmt::Display for StripeCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.gateway, f)
    }
}

impl From<GatewayError> for StripeCallError {
    fn from(gateway: GatewayError) -> Self {
        Self { gateway, body: None }
    }
}

/// Stripe payment gateway.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    async fn get<T: DeserializeOwned>(&self, entity: &str, id: &str) -> Result<T, StripeCallError> {
        let url = format!("{}/{}s/{}", self.config.api_base_url, entity, id);
        let url = url.as_str();

        retry_with_backoff(&self.config.backoff, StripeCallError::is_retryable, || async move {
            let response = self
                .http_client
                .get(url)
                .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
                .send()
                .await
                .map_err(|e| GatewayError::network(e.to_string()))?;

            Self::read(response).await
        })
        .await
    }

    async fn create<T: DeserializeOwned>(
        &self,
        entity: &str,
        params: &[(&str, String)],
    ) -> Result<T, StripeCallError> {
        self.create_keyed(entity, params, &Uuid::new_v4().to_string())
            .await
    }

    async fn create_keyed<T: DeserializeOwned>(
        &self,
        entity: &str,
        params: &[(&str, String)],
        idempotency_key: &str,
    ) -> Result<T, StripeCallError> {
        let url = format!("{}/{}s", self.config.api_base_url, entity);
        let url = url.as_str();

        retry_with_backoff(&self.config.backoff, StripeCallError::is_retryable, || async move {
            let response = self
                .http_client
                .post(url)
                .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
                .header("Idempotency-Key", idempotency_key)
                .form(params)
                .send()
                .await
                .map_err(|e| GatewayError::network(e.to_string()))?;

            Self::read(response).await
        })
        .await
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeCallError> {
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                GatewayError::invalid_response(format!("Failed to parse Stripe response: {}", e))
                    .into()
            });
        }

        let text = response.text().await.unwrap_or_default();
        let envelope: StripeErrorEnvelope = serde_json::from_str(&text).unwrap_or_default();
        let body = envelope.error;

        let mut gateway = GatewayError::new(
            GatewayErrorCode::from_status(status.as_u16()),
            body.message
                .clone()
                .unwrap_or_else(|| format!("Stripe API error: {}", status)),
        );
        if let Some(code) = &body.code {
            gateway = gateway.with_provider_code(code.clone());
        }

        Err(StripeCallError {
            gateway,
            body: Some(body),
        })
    }

    async fn fetch_intent(&self, external_id: &str) -> Result<StripePaymentIntent, GatewayError> {
        self.get("payment_intent", external_id)
            .await
            .map_err(|e| e.gateway)
    }

    fn to_payment(intent: &StripePaymentIntent) -> GatewayPayment {
        GatewayPayment {
            id: intent.id.clone(),
            client_secret: intent.client_secret.clone(),
            state: normalize::payment_state(intent),
            is_automatic: intent.metadata.is_automatic,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn payment_system(&self) -> PaymentSystem {
        PaymentSystem::Stripe
    }

    async fn create_customer(&self, user_id: &UserId, email: &str) -> Result<String, GatewayError> {
        let params = [("id", user_id.to_string()), ("email", email.to_string())];

        match self.create::<serde_json::Value>("customer", &params).await {
            Ok(_) => Ok(user_id.to_string()),
            Err(e) if e.gateway.provider_code.as_deref() == Some("resource_already_exists") => {
                tracing::debug!(user_id = %user_id, "Stripe customer already exists");
                Ok(user_id.to_string())
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Stripe create_customer failed");
                Err(e.gateway)
            }
        }
    }

    async fn create_payment(
        &self,
        customer_ref: &str,
        amount_minor_units: i64,
        currency: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let params = [
            ("customer", customer_ref.to_string()),
            ("amount", amount_minor_units.to_string()),
            ("currency", currency.to_lowercase()),
            ("setup_future_usage", "off_session".to_string()),
            ("metadata[is_automatic]", "0".to_string()),
        ];

        let intent: StripePaymentIntent =
            self.create("payment_intent", &params).await.map_err(|e| {
                tracing::error!(customer = %customer_ref, error = %e, "Stripe create_payment failed");
                e.gateway
            })?;

        tracing::info!(payment_intent = %intent.id, status = ?intent.status, "Stripe payment intent created");
        Ok(Self::to_payment(&intent))
    }

    async fn create_recurring_payment(
        &self,
        customer_ref: &str,
        amount_minor_units: i64,
        currency: &str,
        payment_method_ref: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let params = [
            ("customer", customer_ref.to_string()),
            ("amount", amount_minor_units.to_string()),
            ("currency", currency.to_lowercase()),
            ("payment_method", payment_method_ref.to_string()),
            ("off_session", "true".to_string()),
            ("confirm", "true".to_string()),
            ("metadata[is_automatic]", "1".to_string()),
        ];

        let intent: StripePaymentIntent = match self.create("payment_intent", &params).await {
            Ok(intent) => intent,
            // A declined off-session charge still creates the intent.
            Err(StripeCallError {
                gateway,
                body: Some(StripeErrorBody {
                    payment_intent: Some(raw),
                    ..
                }),
            }) if gateway.code == GatewayErrorCode::PaymentRequired => {
                serde_json::from_value(raw).map_err(|e| {
                    GatewayError::invalid_response(format!("Unreadable declined intent: {}", e))
                })?
            }
            Err(e) => {
                tracing::error!(customer = %customer_ref, error = %e, "Stripe recurring charge failed");
                return Err(e.gateway);
            }
        };

        tracing::info!(payment_intent = %intent.id, status = ?intent.status, "Stripe recurring intent created");
        Ok(Self::to_payment(&intent))
    }

    async fn get_payment(&self, external_id: &str) -> Result<GatewayPayment, GatewayError> {
        let intent = self.fetch_intent(external_id).await?;
        Ok(Self::to_payment(&intent))
    }

    async fn get_payment_status(&self, external_id: &str) -> Result<OrderState, GatewayError> {
        let intent = self.fetch_intent(external_id).await?;
        Ok(normalize::payment_state(&intent))
    }

    async fn get_payment_method(
        &self,
        external_id: &str,
    ) -> Result<GatewayPaymentMethod, GatewayError> {
        let intent = self.fetch_intent(external_id).await?;
        let charge = intent
            .latest_charge()
            .ok_or_else(|| GatewayError::not_found("charge"))?;

        let id = charge
            .payment_method
            .clone()
            .ok_or_else(|| GatewayError::invalid_response("charge has no payment_method"))?;
        let method_type = charge
            .payment_method_details
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| GatewayError::invalid_response("payment_method_details.type missing"))?
            .to_string();
        let display_data = normalize::display_data(&method_type, &charge.payment_method_details)?;

        Ok(GatewayPaymentMethod {
            id,
            method_type,
            display_data,
        })
    }

    async fn create_refund(
        &self,
        src_external_id: &str,
        amount_minor_units: i64,
    ) -> Result<GatewayRefund, GatewayError> {
        let params = [
            ("payment_intent", src_external_id.to_string()),
            ("amount", amount_minor_units.to_string()),
        ];

        let key = refund_idempotency_key(src_external_id);
        let refund: StripeRefund = self.create_keyed("refund", &params, &key).await.map_err(|e| {
            tracing::error!(payment_intent = %src_external_id, error = %e, "Stripe create_refund failed");
            e.gateway
        })?;

        tracing::info!(refund = %refund.id, status = ?refund.status, "Stripe refund created");
        Ok(GatewayRefund {
            id: refund.id,
            amount: money::from_minor_units(refund.amount),
            currency: refund.currency,
            state: normalize::refund_state(refund.status),
        })
    }

    async fn get_refund_status(&self, external_id: &str) -> Result<OrderState, GatewayError> {
        let refund: StripeRefund = self
            .get("refund", external_id)
            .await
            .map_err(|e| e.gateway)?;
        Ok(normalize::refund_state(refund.status))
    }
}

/// Two refunds of one payment collapse into a single Stripe refund.
fn refund_idempotency_key(src_external_id: &str) -> String {
    format!("refund-{}", src_external_id)
}
