//! HTTP handlers for the billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. User endpoints act for the authenticated caller; service
//! endpoints act on the record named in the path.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::billing::{
    ActivateSubscriptionCommand, ActivateSubscriptionHandler, CancelOrderCommand,
    CancelOrderHandler, CancelSubscriptionCommand, CancelSubscriptionHandler,
    DeactivateSubscriptionCommand, DeactivateSubscriptionHandler, GetDraftOrderHandler,
    GetDraftOrderQuery, GetSubscriptionHandler, ListPaymentMethodsHandler, ListProductsHandler,
    RecurringChargeCommand, RecurringChargeHandler, RefundSubscriptionCommand,
    RefundSubscriptionHandler, StartPaymentCommand, StartPaymentHandler, UpdateOrderCommand,
    UpdateOrderHandler,
};
use crate::application::GatewayRegistry;
use crate::domain::billing::{BillingError, Subscription};
use crate::domain::foundation::{OrderId, SubscriptionId};
use crate::ports::{BillingRepository, EntitlementService};

use super::dto::{
    ErrorResponse, OrderStateResponse, PaymentInfoResponse, PaymentMethodResponse,
    PaymentRequest, ProductResponse, RefundResponse, SubscriptionResponse,
    SubscriptionStateResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; handlers are built on demand from it.
#[derive(Clone)]
pub struct BillingAppState {
    pub repository: Arc<dyn BillingRepository>,
    pub gateways: GatewayRegistry,
    pub entitlements: Arc<dyn EntitlementService>,
}

impl BillingAppState {
    pub fn start_payment_handler(&self) -> StartPaymentHandler {
        StartPaymentHandler::new(self.repository.clone(), self.gateways.clone())
    }

    pub fn draft_order_handler(&self) -> GetDraftOrderHandler {
        GetDraftOrderHandler::new(self.repository.clone(), self.gateways.clone())
    }

    pub fn payment_methods_handler(&self) -> ListPaymentMethodsHandler {
        ListPaymentMethodsHandler::new(self.repository.clone())
    }

    pub fn products_handler(&self) -> ListProductsHandler {
        ListProductsHandler::new(self.repository.clone())
    }

    pub fn subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.repository.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.repository.clone())
    }

    pub fn refund_handler(&self) -> RefundSubscriptionHandler {
        RefundSubscriptionHandler::new(self.repository.clone(), self.gateways.clone())
    }

    pub fn update_order_handler(&self) -> UpdateOrderHandler {
        UpdateOrderHandler::new(
            self.repository.clone(),
            self.gateways.clone(),
            self.entitlements.clone(),
        )
    }

    pub fn cancel_order_handler(&self) -> CancelOrderHandler {
        CancelOrderHandler::new(self.repository.clone())
    }

    pub fn activate_handler(&self) -> ActivateSubscriptionHandler {
        ActivateSubscriptionHandler::new(self.repository.clone(), self.entitlements.clone())
    }

    pub fn recurring_charge_handler(&self) -> RecurringChargeHandler {
        RecurringChargeHandler::new(
            self.repository.clone(),
            self.gateways.clone(),
            self.entitlements.clone(),
        )
    }

    pub fn deactivate_handler(&self) -> DeactivateSubscriptionHandler {
        DeactivateSubscriptionHandler::new(self.repository.clone(), self.entitlements.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/user/payment - Start paying for a product
pub async fn create_payment(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<PaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let session = state
        .start_payment_handler()
        .handle(StartPaymentCommand {
            user_id: user.id,
            product_id: request.product_id,
            email: request.email,
            payment_system: request.payment_system,
        })
        .await?;

    Ok(Json(PaymentInfoResponse::from(session)))
}

/// GET /api/user/order/draft - Resume the outstanding payment
pub async fn get_draft_order(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let session = state
        .draft_order_handler()
        .handle(GetDraftOrderQuery { user_id: user.id })
        .await?;

    Ok(Json(PaymentInfoResponse::from(session)))
}

/// GET /api/user/payment_methods
pub async fn list_payment_methods(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let methods = state.payment_methods_handler().handle(&user.id).await?;
    let response: Vec<PaymentMethodResponse> = methods.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// GET /api/user/products - Products on sale
pub async fn list_products(
    State(state): State<BillingAppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let products = state.products_handler().handle().await?;
    let response: Vec<ProductResponse> = products.into_iter().map(Into::into).collect();
    Ok(Json(response))
}

/// GET /api/user/subscription - Current subscription with its product
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let details = state.subscription_handler().handle(&user.id).await?;
    Ok(Json(SubscriptionResponse::from(details)))
}

/// POST /api/user/subscription/cancel
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let subscription = state
        .cancel_subscription_handler()
        .handle(CancelSubscriptionCommand { user_id: user.id })
        .await?;

    Ok(Json(subscription_state(&subscription)))
}

/// POST /api/user/subscription/refund - Refund the unused part of the period
pub async fn refund_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .refund_handler()
        .handle(RefundSubscriptionCommand { user_id: user.id })
        .await?;

    Ok(Json(RefundResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Service Endpoints (scheduler only)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/service/order/:id/update_info - Re-poll the gateway
pub async fn update_order(
    State(state): State<BillingAppState>,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .update_order_handler()
        .handle(UpdateOrderCommand { order_id })
        .await?;

    Ok(Json(OrderStateResponse::from(result)))
}

/// POST /api/service/order/:id/cancel - Close an unsettled order
pub async fn cancel_order(
    State(state): State<BillingAppState>,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let order_state = state
        .cancel_order_handler()
        .handle(CancelOrderCommand { order_id })
        .await?;

    Ok(Json(OrderStateResponse {
        order_id,
        state: order_state,
    }))
}

/// POST /api/service/subscription/:id/activate
pub async fn activate_subscription(
    State(state): State<BillingAppState>,
    Path(subscription_id): Path<SubscriptionId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let subscription = state
        .activate_handler()
        .handle(ActivateSubscriptionCommand { subscription_id })
        .await?;

    Ok(Json(subscription_state(&subscription)))
}

/// POST /api/service/subscription/:id/recurring_payment
pub async fn recurring_payment(
    State(state): State<BillingAppState>,
    Path(subscription_id): Path<SubscriptionId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let order = state
        .recurring_charge_handler()
        .handle(RecurringChargeCommand { subscription_id })
        .await?;

    Ok((StatusCode::CREATED, Json(OrderStateResponse::from(order))))
}

/// POST /api/service/subscription/:id/deactivate
pub async fn deactivate_subscription(
    State(state): State<BillingAppState>,
    Path(subscription_id): Path<SubscriptionId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let subscription = state
        .deactivate_handler()
        .handle(DeactivateSubscriptionCommand { subscription_id })
        .await?;

    Ok(Json(subscription_state(&subscription)))
}

fn subscription_state(subscription: &Subscription) -> SubscriptionStateResponse {
    SubscriptionStateResponse {
        subscription_id: subscription.id,
        state: subscription.state,
        end_date: subscription.end_date.date(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::ProductNotFound(_)
            | BillingError::OrderNotFound(_)
            | BillingError::SubscriptionNotFound(_)
            | BillingError::ActiveSubscriptionNotFound(_)
            | BillingError::PaidOrderNotFound(_)
            | BillingError::NoUnpaidOrder(_)
            | BillingError::PaymentMethodNotFound(_)
            | BillingError::EntitlementTargetNotFound { .. } => StatusCode::NOT_FOUND,

            BillingError::UserHasSubscription(_)
            | BillingError::UserHasProcessingOrder(_)
            | BillingError::UserHasDraftOrder(_)
            | BillingError::OrderAlreadyPaid(_)
            | BillingError::OrderSettled(_)
            | BillingError::InvalidState { .. } => StatusCode::CONFLICT,

            BillingError::ProductInactive(_)
            | BillingError::SubscriptionExpired(_)
            | BillingError::UnsupportedPaymentSystem(_)
            | BillingError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,

            BillingError::Gateway { .. } | BillingError::Entitlement(_) => StatusCode::BAD_GATEWAY,

            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "Request failed");
        } else {
            tracing::debug!(code = self.0.code(), error = %self.0, "Request rejected");
        }

        let body = ErrorResponse::new(self.0.code(), self.0.message());
        (status, Json(body)).into_response()
    }
}
