//! Mock payment gateway for testing.
//!
//! Keeps payments and refunds in memory. Tests script the state the next
//! created payment lands in, flip the state a later poll reports, inject
//! errors per method and assert on the call log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::json;

use crate::domain::billing::{money, OrderState, PaymentSystem};
use crate::domain::foundation::UserId;
use crate::ports::{
    GatewayError, GatewayPayment, GatewayPaymentMethod, GatewayRefund, PaymentGateway,
};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.set_next_payment_state(OrderState::Processing);
/// // ... run the purchase ...
/// gateway.settle_payment("pi_mock_1", OrderState::Paid);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    payments: HashMap<String, MockPayment>,
    refunds: HashMap<String, GatewayRefund>,
    next_payment_state: Option<OrderState>,
    next_recurring_state: Option<OrderState>,
    next_refund_state: Option<OrderState>,
    method_errors: HashMap<String, GatewayError>,
    call_log: Vec<MethodCall>,
    sequence: u32,
}

#[derive(Debug, Clone)]
struct MockPayment {
    state: OrderState,
    is_automatic: bool,
    client_secret: Option<String>,
    payment_method: String,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// State reported by the next `create_payment` (default `draft`).
    pub fn set_next_payment_state(&self, state: OrderState) {
        self.state().next_payment_state = Some(state);
    }

    /// State reported by the next `create_recurring_payment` (default `paid`).
    pub fn set_next_recurring_state(&self, state: OrderState) {
        self.state().next_recurring_state = Some(state);
    }

    /// State reported by the next `create_refund` (default `paid`).
    pub fn set_next_refund_state(&self, state: OrderState) {
        self.state().next_refund_state = Some(state);
    }

    /// Changes what later polls of a payment report.
    pub fn settle_payment(&self, external_id: &str, state: OrderState) {
        if let Some(payment) = self.state().payments.get_mut(external_id) {
            payment.state = state;
        }
    }

    pub fn settle_refund(&self, external_id: &str, state: OrderState) {
        if let Some(refund) = self.state().refunds.get_mut(external_id) {
            refund.state = state;
        }
    }

    /// Fails every call of `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Ids of every payment created so far, oldest first.
    pub fn payment_ids(&self) -> Vec<String> {
        let state = self.state();
        let mut ids: Vec<_> = state.payments.keys().cloned().collect();
        ids.sort_by_key(|id| id.rsplit('_').next().and_then(|n| n.parse::<u32>().ok()));
        ids
    }

    fn begin_call(&self, method: &str, args: Vec<String>) -> Result<MutexGuard<'_, MockState>, GatewayError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        if let Some(err) = state.method_errors.get(method).cloned() {
            return Err(err);
        }
        Ok(state)
    }

    fn next_id(state: &mut MockState, prefix: &str) -> String {
        state.sequence += 1;
        format!("{}_mock_{}", prefix, state.sequence)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn payment_system(&self) -> PaymentSystem {
        PaymentSystem::Stripe
    }

    async fn create_customer(&self, user_id: &UserId, email: &str) -> Result<String, GatewayError> {
        self.begin_call("create_customer", vec![user_id.to_string(), email.to_string()])?;
        Ok(user_id.to_string())
    }

    async fn create_payment(
        &self,
        customer_ref: &str,
        amount_minor_units: i64,
        currency: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let mut state = self.begin_call(
            "create_payment",
            vec![
                customer_ref.to_string(),
                amount_minor_units.to_string(),
                currency.to_string(),
            ],
        )?;

        let id = Self::next_id(&mut state, "pi");
        let payment = MockPayment {
            state: state.next_payment_state.take().unwrap_or(OrderState::Draft),
            is_automatic: false,
            client_secret: Some(format!("{}_secret", id)),
            payment_method: format!("pm_for_{}", id),
        };
        state.payments.insert(id.clone(), payment.clone());

        Ok(GatewayPayment {
            id,
            client_secret: payment.client_secret,
            state: payment.state,
            is_automatic: false,
        })
    }

    async fn create_recurring_payment(
        &self,
        customer_ref: &str,
        amount_minor_units: i64,
        currency: &str,
        payment_method_ref: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let mut state = self.begin_call(
            "create_recurring_payment",
            vec![
                customer_ref.to_string(),
                amount_minor_units.to_string(),
                currency.to_string(),
                payment_method_ref.to_string(),
            ],
        )?;

        let id = Self::next_id(&mut state, "pi");
        let payment = MockPayment {
            state: state.next_recurring_state.take().unwrap_or(OrderState::Paid),
            is_automatic: true,
            client_secret: None,
            payment_method: payment_method_ref.to_string(),
        };
        state.payments.insert(id.clone(), payment.clone());

        Ok(GatewayPayment {
            id,
            client_secret: None,
            state: payment.state,
            is_automatic: true,
        })
    }

    async fn get_payment(&self, external_id: &str) -> Result<GatewayPayment, GatewayError> {
        let state = self.begin_call("get_payment", vec![external_id.to_string()])?;
        let payment = state
            .payments
            .get(external_id)
            .ok_or_else(|| GatewayError::not_found("payment_intent"))?;

        Ok(GatewayPayment {
            id: external_id.to_string(),
            client_secret: payment.client_secret.clone(),
            state: payment.state,
            is_automatic: payment.is_automatic,
        })
    }

    async fn get_payment_status(&self, external_id: &str) -> Result<OrderState, GatewayError> {
        let state = self.begin_call("get_payment_status", vec![external_id.to_string()])?;
        state
            .payments
            .get(external_id)
            .map(|p| p.state)
            .ok_or_else(|| GatewayError::not_found("payment_intent"))
    }

    async fn get_payment_method(
        &self,
        external_id: &str,
    ) -> Result<GatewayPaymentMethod, GatewayError> {
        let state = self.begin_call("get_payment_method", vec![external_id.to_string()])?;
        let payment = state
            .payments
            .get(external_id)
            .ok_or_else(|| GatewayError::not_found("payment_intent"))?;

        Ok(GatewayPaymentMethod {
            id: payment.payment_method.clone(),
            method_type: "card".to_string(),
            display_data: json!({
                "brand": "visa",
                "exp_month": 12,
                "exp_year": 2030,
                "last4": "4242"
            }),
        })
    }

    async fn create_refund(
        &self,
        src_external_id: &str,
        amount_minor_units: i64,
    ) -> Result<GatewayRefund, GatewayError> {
        let mut state = self.begin_call(
            "create_refund",
            vec![src_external_id.to_string(), amount_minor_units.to_string()],
        )?;

        if !state.payments.contains_key(src_external_id) {
            return Err(GatewayError::not_found("payment_intent"));
        }

        let id = Self::next_id(&mut state, "re");
        let refund = GatewayRefund {
            id: id.clone(),
            amount: money::from_minor_units(amount_minor_units),
            currency: "usd".to_string(),
            state: state.next_refund_state.take().unwrap_or(OrderState::Paid),
        };
        state.refunds.insert(id, refund.clone());
        Ok(refund)
    }

    async fn get_refund_status(&self, external_id: &str) -> Result<OrderState, GatewayError> {
        let state = self.begin_call("get_refund_status", vec![external_id.to_string()])?;
        state
            .refunds
            .get(external_id)
            .map(|r| r.state)
            .ok_or_else(|| GatewayError::not_found("refund"))
    }
}
