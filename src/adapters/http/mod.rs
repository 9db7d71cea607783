//! HTTP adapters - REST API implementations.
//!
//! [`api_router`] assembles the full application:
//!
//! ```text
//! /health              liveness
//! /api/user/...        user endpoints (bearer auth)
//! /api/service/...     scheduler endpoints (internal network)
//! ```

pub mod billing;
pub mod middleware;

use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use billing::{BillingApiError, BillingAppState};
pub use middleware::AuthState;

/// Builds the application router with tracing, request ids and a request timeout.
pub fn api_router(state: BillingAppState, auth: AuthState, request_timeout: Duration) -> Router {
    let user_api = billing::user_routes().layer(axum::middleware::from_fn_with_state(
        auth,
        middleware::auth_middleware,
    ));

    let api = Router::new()
        .nest("/user", user_api)
        .nest("/service", billing::service_routes())
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::entitlement::MockEntitlementService;
    use crate::adapters::memory::InMemoryBillingRepository;
    use crate::application::GatewayRegistry;

    fn app() -> Router {
        let state = BillingAppState {
            repository: Arc::new(InMemoryBillingRepository::new()),
            gateways: GatewayRegistry::new(),
            entitlements: Arc::new(MockEntitlementService::new()),
        };
        api_router(
            state,
            AuthState::new(Arc::new(MockSessionValidator::new())),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn health_is_ok_and_echoes_request_id() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn user_api_requires_authentication() {
        let response = app()
            .oneshot(Request::builder().uri("/api/user/products").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn service_api_does_not_require_authentication() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/service/order/{}/cancel", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
