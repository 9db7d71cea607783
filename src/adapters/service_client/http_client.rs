//! reqwest client of the billing service API.
//!
//! Every operation is a bodyless `POST {base}/{resource}/{id}/{action}`.
//! Connection failures and 5xx answers are retried with backoff; any other
//! non-2xx answer is a definitive rejection carrying the service's error code.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::adapters::reliability::{retry_with_backoff, BackoffPolicy};
use crate::domain::foundation::{OrderId, SubscriptionId};
use crate::ports::{ReconciliationApi, ServiceCallError};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

pub struct HttpReconciliationClient {
    /// e.g. `http://billing-api:8787/api/service`
    base_url: String,
    http_client: reqwest::Client,
    backoff: BackoffPolicy,
}

impl HttpReconciliationClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        backoff: BackoffPolicy,
    ) -> Result<Self, ServiceCallError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceCallError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            backoff,
        })
    }

    fn url(&self, resource: &str, id: &dyn std::fmt::Display, action: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url, resource, id, action)
    }

    async fn post(&self, url: String) -> Result<(), ServiceCallError> {
        retry_with_backoff(&self.backoff, is_transient, || {
            let request = self.http_client.post(url.as_str());
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| ServiceCallError::Unavailable(e.to_string()))?;

                let status = response.status();
                if status.is_success() {
                    return Ok(());
                }

                let text = response.text().await.unwrap_or_default();
                Err(rejection(status.as_u16(), &text))
            }
        })
        .await
    }
}

fn is_transient(error: &ServiceCallError) -> bool {
    match error {
        ServiceCallError::Unavailable(_) => true,
        ServiceCallError::Rejected { status, .. } => *status >= 500,
    }
}

fn rejection(status: u16, body: &str) -> ServiceCallError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(error) => ServiceCallError::Rejected {
            status,
            code: error.code,
            message: error.message,
        },
        Err(_) => ServiceCallError::Rejected {
            status,
            code: "UNKNOWN".to_string(),
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl ReconciliationApi for HttpReconciliationClient {
    async fn update_order(&self, id: OrderId) -> Result<(), ServiceCallError> {
        self.post(self.url("order", &id, "update_info")).await
    }

    async fn cancel_order(&self, id: OrderId) -> Result<(), ServiceCallError> {
        self.post(self.url("order", &id, "cancel")).await
    }

    async fn activate_subscription(&self, id: SubscriptionId) -> Result<(), ServiceCallError> {
        self.post(self.url("subscription", &id, "activate")).await
    }

    async fn recurring_charge(&self, id: SubscriptionId) -> Result<(), ServiceCallError> {
        self.post(self.url("subscription", &id, "recurring_payment")).await
    }

    async fn deactivate_subscription(&self, id: SubscriptionId) -> Result<(), ServiceCallError> {
        self.post(self.url("subscription", &id, "deactivate")).await
    }
}
