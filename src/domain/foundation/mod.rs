//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, the state machine trait and error types that the
//! billing domain is built from.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OrderId, PaymentMethodId, ProductId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
