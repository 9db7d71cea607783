//! Role service adapters.

mod http_client;
mod mock;

pub use http_client::HttpEntitlementService;
pub use mock::MockEntitlementService;
