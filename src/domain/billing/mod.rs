//! Billing domain - orders, subscriptions and the rules binding them.
//!
//! # State machines
//!
//! - [`OrderState`]: `draft`/`processing` until the gateway settles the
//!   charge as `paid` or `error`.
//! - [`SubscriptionState`]: `inactive` -> `pre_active` -> `active`, then
//!   `to_deactivate` (refund) or `cancelled` (user), back to `inactive`.
//!
//! Aggregates ([`Order`], [`Subscription`]) only change state through their
//! methods, which validate every move against those tables.

mod errors;
pub mod money;
mod order;
mod order_state;
mod payment_method;
mod payment_system;
mod product;
mod refund;
mod subscription;
mod subscription_state;

pub use errors::BillingError;
pub use order::Order;
pub use order_state::OrderState;
pub use payment_method::{promote_default, PaymentMethod};
pub use payment_system::PaymentSystem;
pub use product::Product;
pub use refund::calculate_refund_amount;
pub use subscription::Subscription;
pub use subscription_state::SubscriptionState;
