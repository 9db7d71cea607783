//! HTTP client of the role service.
//!
//! `POST {base}/{user}/role/{role}` grants, `DELETE` on the same path
//! revokes. 404 and 409 are definitive answers, connection failures are
//! retried with backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::adapters::reliability::{retry_with_backoff, BackoffPolicy};
use crate::domain::foundation::UserId;
use crate::ports::{EntitlementError, EntitlementService, GrantOutcome, RevokeOutcome};

/// Role service client.
pub struct HttpEntitlementService {
    /// e.g. `http://auth:8000/api/v1/admin/user`
    base_url: String,
    http_client: reqwest::Client,
    backoff: BackoffPolicy,
}

impl HttpEntitlementService {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        backoff: BackoffPolicy,
    ) -> Result<Self, EntitlementError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EntitlementError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            backoff,
        })
    }

    fn role_url(&self, user_id: &UserId, role_id: &str) -> String {
        format!("{}/{}/role/{}", self.base_url, user_id, role_id)
    }

    async fn send(&self, method: reqwest::Method, url: &str) -> Result<StatusCode, EntitlementError> {
        retry_with_backoff(
            &self.backoff,
            |e: &EntitlementError| matches!(e, EntitlementError::Unavailable(_)),
            || {
                let request = self.http_client.request(method.clone(), url);
                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| EntitlementError::Unavailable(e.to_string()))?;
                    let status = response.status();
                    if status.is_success()
                        || status == StatusCode::NOT_FOUND
                        || status == StatusCode::CONFLICT
                    {
                        return Ok(status);
                    }
                    let body = response.text().await.unwrap_or_default();
                    Err(EntitlementError::UnexpectedResponse {
                        status: status.as_u16(),
                        body,
                    })
                }
            },
        )
        .await
    }
}

#[async_trait]
impl EntitlementService for HttpEntitlementService {
    async fn grant_role(&self, user_id: &UserId, role_id: &str) -> Result<GrantOutcome, EntitlementError> {
        let status = self
            .send(reqwest::Method::POST, &self.role_url(user_id, role_id))
            .await?;

        let outcome = match status {
            StatusCode::NOT_FOUND => GrantOutcome::NotFound,
            StatusCode::CONFLICT => GrantOutcome::Conflict,
            _ => GrantOutcome::Granted,
        };
        tracing::info!(user_id = %user_id, role_id = %role_id, outcome = ?outcome, "Role grant");
        Ok(outcome)
    }

    async fn revoke_role(&self, user_id: &UserId, role_id: &str) -> Result<RevokeOutcome, EntitlementError> {
        let status = self
            .send(reqwest::Method::DELETE, &self.role_url(user_id, role_id))
            .await?;

        let outcome = match status {
            StatusCode::NOT_FOUND => RevokeOutcome::NotFound,
            _ => RevokeOutcome::Revoked,
        };
        tracing::info!(user_id = %user_id, role_id = %role_id, outcome = ?outcome, "Role revoke");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpEntitlementService {
        HttpEntitlementService::new(base, Duration::from_millis(200), BackoffPolicy::no_retry()).unwrap()
    }

    #[test]
    fn role_url_follows_admin_path() {
        let service = client("http://auth:8000/api/v1/admin/user/");
        let url = service.role_url(&UserId::new("u-1").unwrap(), "premium");
        assert_eq!(url, "http://auth:8000/api/v1/admin/user/u-1/role/premium");
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let service = client("http://127.0.0.1:9/api/v1/admin/user");
        let err = service
            .grant_role(&UserId::new("u-1").unwrap(), "premium")
            .await
            .unwrap_err();
        assert!(matches!(err, EntitlementError::Unavailable(_)));
    }
}
