//! Payment system tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::BillingError;

/// Payment provider an order or payment method belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentSystem {
    Stripe,
}

impl PaymentSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSystem::Stripe => "stripe",
        }
    }
}

impl fmt::Display for PaymentSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentSystem {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(PaymentSystem::Stripe),
            _ => Err(BillingError::UnsupportedPaymentSystem(s.to_string())),
        }
    }
}
