//! In-memory persistence for tests and local development.

mod billing_repository;

pub use billing_repository::InMemoryBillingRepository;
