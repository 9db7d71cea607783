//! Billing HTTP adapter - user and service endpoints.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{BillingApiError, BillingAppState};
pub use routes::{service_routes, user_routes};
