//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing core and the outside world. Adapters implement these ports.
//!
//! ## External Services
//!
//! - `PaymentGateway` - Charges, recurring charges, refunds, status queries
//! - `EntitlementService` - Grants and revokes product roles
//! - `SessionValidator` - Bearer token validation
//!
//! ## Persistence
//!
//! - `BillingRepository` / `BillingTransaction` - Reads and unit-of-work writes
//! - `SweepQueries` - Predicates the scheduler sweeps over
//!
//! ## Scheduler
//!
//! - `ReconciliationApi` - Service-facing operations a sweep replays

mod billing_repository;
mod entitlement_service;
mod payment_gateway;
mod reconciliation_api;
mod session_validator;
mod sweep_queries;

pub use billing_repository::{BillingRepository, BillingTransaction, OrderDetails, SubscriptionDetails};
pub use entitlement_service::{EntitlementError, EntitlementService, GrantOutcome, RevokeOutcome};
pub use payment_gateway::{
    GatewayError, GatewayErrorCode, GatewayPayment, GatewayPaymentMethod, GatewayRefund,
    PaymentGateway,
};
pub use reconciliation_api::{ReconciliationApi, ServiceCallError};
pub use session_validator::SessionValidator;
pub use sweep_queries::{FailedChargePolicy, SweepQueries};
