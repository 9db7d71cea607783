//! Order lifecycle state machine.
//!
//! An order settles in `paid` or `error`. Until then the gateway may move it
//! back and forth between `draft` and `processing` (a declined manual charge
//! returns to `draft` so the user can retry).

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Normalized state of one payment or refund attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Created locally or awaiting user confirmation at the gateway.
    Draft,

    /// Gateway reports the charge in flight.
    Processing,

    /// Terminal success.
    Paid,

    /// Terminal failure or manual cancellation.
    Error,
}

impl OrderState {
    pub const ALL: [OrderState; 4] = [
        OrderState::Draft,
        OrderState::Processing,
        OrderState::Paid,
        OrderState::Error,
    ];

    /// True while the order still waits for the gateway to settle it.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, OrderState::Draft | OrderState::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        self.label()
    }
}

impl StateMachine for OrderState {
    const ENTITY: &'static str = "order";

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderState::*;
        match self {
            Draft | Processing => vec![Draft, Processing, Paid, Error],
            Paid | Error => vec![],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            OrderState::Draft => "draft",
            OrderState::Processing => "processing",
            OrderState::Paid => "paid",
            OrderState::Error => "error",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.label() == s)
            .ok_or_else(|| ValidationError::invalid_format("order_state", format!("unknown state '{}'", s)))
    }
}
