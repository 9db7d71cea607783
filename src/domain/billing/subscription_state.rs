//! Subscription lifecycle state machine.

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// State of a user's entitlement window.
///
/// ```text
/// inactive      -> pre_active | active | cancelled
/// pre_active    -> active | cancelled
/// active        -> active | to_deactivate | cancelled | inactive
/// to_deactivate -> inactive
/// cancelled     -> inactive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Initial or lapsed. No entitlement.
    Inactive,

    /// Payment captured, entitlement grant pending.
    PreActive,

    /// Entitlement granted, window open.
    Active,

    /// Refund in flight, revocation pending.
    ToDeactivate,

    /// Terminated by the user; revoked by the overdue sweep.
    Cancelled,
}

impl SubscriptionState {
    pub const ALL: [SubscriptionState; 5] = [
        SubscriptionState::Inactive,
        SubscriptionState::PreActive,
        SubscriptionState::Active,
        SubscriptionState::ToDeactivate,
        SubscriptionState::Cancelled,
    ];

    /// States counted by the one-subscription-per-user rule.
    pub fn is_current(&self) -> bool {
        matches!(self, SubscriptionState::Active | SubscriptionState::PreActive)
    }

    /// Activation from these states must grant the role.
    pub fn requires_grant_on_activation(&self) -> bool {
        matches!(self, SubscriptionState::Inactive | SubscriptionState::PreActive)
    }

    pub fn as_str(&self) -> &'static str {
        self.label()
    }
}

impl StateMachine for SubscriptionState {
    const ENTITY: &'static str = "subscription";

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionState::*;
        match self {
            Inactive => vec![PreActive, Active, Cancelled],
            PreActive => vec![Active, Cancelled],
            // Active -> Active is a renewal.
            Active => vec![Active, ToDeactivate, Cancelled, Inactive],
            ToDeactivate => vec![Inactive],
            Cancelled => vec![Inactive],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SubscriptionState::Inactive => "inactive",
            SubscriptionState::PreActive => "pre_active",
            SubscriptionState::Active => "active",
            SubscriptionState::ToDeactivate => "to_deactivate",
            SubscriptionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SubscriptionState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionState::ALL
            .into_iter()
            .find(|state| state.label() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("subscription_state", format!("unknown state '{}'", s))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionState::*;

    #[test]
    fn first_payment_moves_inactive_to_pre_active() {
        assert!(Inactive.can_transition_to(&PreActive));
    }

    #[test]
    fn activation_allowed_from_inactive_pre_active_and_active() {
        for from in [Inactive, PreActive, Active] {
            assert!(from.can_transition_to(&Active), "{} -> active", from);
        }
        assert!(!ToDeactivate.can_transition_to(&Active));
        assert!(!Cancelled.can_transition_to(&Active));
    }

    #[test]
    fn only_active_can_be_marked_for_deactivation() {
        for from in SubscriptionState::ALL {
            assert_eq!(from.can_transition_to(&ToDeactivate), from == Active);
        }
    }

    #[test]
    fn deactivation_sources() {
        assert!(Active.can_transition_to(&Inactive));
        assert!(ToDeactivate.can_transition_to(&Inactive));
        assert!(Cancelled.can_transition_to(&Inactive));
        assert!(!PreActive.can_transition_to(&Inactive));
    }

    #[test]
    fn no_state_is_terminal() {
        for state in SubscriptionState::ALL {
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn grant_needed_only_when_not_yet_active() {
        assert!(Inactive.requires_grant_on_activation());
        assert!(PreActive.requires_grant_on_activation());
        assert!(!Active.requires_grant_on_activation());
    }

    #[test]
    fn parses_persisted_labels() {
        assert_eq!("pre_active".parse::<SubscriptionState>().unwrap(), PreActive);
        assert_eq!("to_deactivate".parse::<SubscriptionState>().unwrap(), ToDeactivate);
        assert!("expired".parse::<SubscriptionState>().is_err());
    }
}
