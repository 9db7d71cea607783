//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers serve the user and service APIs; the scheduler drives the
//! service API on a timetable.

pub mod gateway_registry;
pub mod handlers;
pub mod scheduler;

pub use gateway_registry::GatewayRegistry;
