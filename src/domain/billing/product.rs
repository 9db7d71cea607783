//! Sellable product plans.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, Timestamp};

/// A plan users can subscribe to.
///
/// Products are maintained by administrators; billing only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// ISO 4217 code, lowercase as the gateway expects it.
    pub currency_code: String,
    /// Length of one billing period.
    pub period_days: u32,
    /// Role granted by the entitlement service while subscribed.
    pub role_id: String,
    pub active: bool,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Product {
    pub fn is_on_sale(&self) -> bool {
        self.active
    }
}
