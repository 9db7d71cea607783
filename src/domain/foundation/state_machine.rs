//! State machine trait for lifecycle enums.
//!
//! Order and subscription states both implement [`StateMachine`], so every
//! aggregate method validates its transition the same way.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list their legal targets once; `transition_to` and
/// `is_terminal` follow from that table.
///
/// ```ignore
/// let next = OrderState::Processing.transition_to(OrderState::Paid)?;
/// assert!(next.is_terminal());
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Name used in transition errors ("order", "subscription").
    const ENTITY: &'static str;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Stable lowercase label, matching the persisted value.
    fn label(&self) -> &'static str;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_transition(
                Self::ENTITY,
                self.label(),
                target.label(),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Off,
        On,
        Broken,
    }

    impl StateMachine for Light {
        const ENTITY: &'static str = "light";

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Light::Off => vec![Light::On, Light::Broken],
                Light::On => vec![Light::Off, Light::Broken],
                Light::Broken => vec![],
            }
        }

        fn label(&self) -> &'static str {
            match self {
                Light::Off => "off",
                Light::On => "on",
                Light::Broken => "broken",
            }
        }
    }

    #[test]
    fn transition_to_accepts_listed_target() {
        assert_eq!(Light::Off.transition_to(Light::On), Ok(Light::On));
    }

    #[test]
    fn transition_to_rejects_unlisted_target() {
        let err = Light::Broken.transition_to(Light::On).unwrap_err();
        assert_eq!(err, ValidationError::invalid_transition("light", "broken", "on"));
    }

    #[test]
    fn terminal_means_no_targets() {
        assert!(Light::Broken.is_terminal());
        assert!(!Light::Off.is_terminal());
    }
}
