//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe, including:
//! - Customer creation
//! - Manual and off-session payment intents
//! - Refunds
//! - Normalization of intent, charge and refund statuses
//!
//! # Security
//!
//! - The secret key is held in `secrecy::SecretString`
//! - Only display fields of a payment method leave the adapter
//!
//! # Configuration
//!
//! - `BILLING__STRIPE__API_KEY`: Stripe secret API key
//! - `BILLING__STRIPE__API_BASE_URL`: optional override

mod mock_gateway;
mod models;
mod normalize;
mod stripe_gateway;

pub use mock_gateway::{MethodCall, MockPaymentGateway};
pub use stripe_gateway::{StripeConfig, StripeGateway};
