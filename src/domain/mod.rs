//! Domain layer - Pure business logic with no external dependencies.
//!
//! - `foundation` - Identifiers, timestamps, errors, the state machine trait
//! - `billing` - Products, orders, subscriptions, payment methods, refunds

pub mod billing;
pub mod foundation;
