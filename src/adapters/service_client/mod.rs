//! Client side of the service API, used by the scheduler.

mod http_client;

pub use http_client::HttpReconciliationClient;
