//! Subscription Billing - order and subscription reconciliation service
//!
//! Sells time-boxed subscriptions through an external payment gateway and
//! keeps a role service in step with what users have paid for. The HTTP API
//! (`billing-api`) serves users and an internal service surface; the
//! sweeper (`billing-scheduler`) replays service operations on a timetable.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
