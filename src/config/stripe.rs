//! Stripe gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::reliability::BackoffPolicy;
use crate::adapters::stripe::StripeConfig;

use super::error::{check_url, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    /// Secret key (sk_live_... or sk_test_...)
    pub api_key: SecretString,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl StripeSettings {
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        let key = self.api_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE__API_KEY"));
        }
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if production && key.starts_with("sk_test_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        check_url("STRIPE__BASE_URL", &self.base_url, production)?;
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    /// Adapter configuration for these settings.
    pub fn gateway_config(&self, backoff: BackoffPolicy) -> StripeConfig {
        StripeConfig::new(self.api_key.expose_secret().as_str())
            .with_base_url(self.base_url.as_str())
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_backoff(backoff)
    }
}

fn default_base_url() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
