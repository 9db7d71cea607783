//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    activate_subscription, cancel_order, cancel_subscription, create_payment,
    deactivate_subscription, get_draft_order, get_subscription, list_payment_methods,
    list_products, recurring_payment, refund_subscription, update_order, BillingAppState,
};

/// User endpoints, all requiring an authenticated caller.
///
/// - `POST /payment` - Start paying for a product
/// - `GET /order/draft` - Resume the outstanding payment
/// - `GET /payment_methods` - Saved payment methods
/// - `GET /products` - Products on sale
/// - `GET /subscription` - Current subscription
/// - `POST /subscription/cancel` - Cancel at period end
/// - `POST /subscription/refund` - Refund the unused days
pub fn user_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/payment", post(create_payment))
        .route("/order/draft", get(get_draft_order))
        .route("/payment_methods", get(list_payment_methods))
        .route("/products", get(list_products))
        .route("/subscription", get(get_subscription))
        .route("/subscription/cancel", post(cancel_subscription))
        .route("/subscription/refund", post(refund_subscription))
}

/// Service endpoints driven by the scheduler. Reachable on the internal
/// network only; no caller authentication.
pub fn service_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/order/:id/update_info", post(update_order))
        .route("/order/:id/cancel", post(cancel_order))
        .route("/subscription/:id/activate", post(activate_subscription))
        .route("/subscription/:id/recurring_payment", post(recurring_payment))
        .route("/subscription/:id/deactivate", post(deactivate_subscription))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_routes_creates_router() {
        let _router: Router<BillingAppState> = user_routes();
    }

    #[test]
    fn service_routes_creates_router() {
        let _router: Router<BillingAppState> = service_routes();
    }
}
