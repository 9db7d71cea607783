//! Reliability helpers shared by outbound HTTP adapters.

mod retry;

pub use retry::{retry_with_backoff, BackoffPolicy};
