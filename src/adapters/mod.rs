//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `stripe` - Payment gateway over the Stripe REST API, plus a mock
//! - `entitlement` - Role service client, plus a mock
//! - `auth` - Bearer token validators
//! - `postgres` - sqlx repository and sweep queries
//! - `memory` - In-memory repository for tests and local runs
//! - `http` - axum routers for the user and service APIs
//! - `service_client` - The scheduler's client of the service API
//! - `reliability` - Retry with capped exponential backoff

pub mod auth;
pub mod entitlement;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod reliability;
pub mod service_client;
pub mod stripe;
