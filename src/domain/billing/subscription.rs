//! Subscription aggregate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ProductId, StateMachine, SubscriptionId, Timestamp, UserId, ValidationError,
};

use super::SubscriptionState;

/// One user's entitlement window for one product.
///
/// State only changes through the methods below; each validates the move
/// against [`SubscriptionState`]'s transition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub state: SubscriptionState,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Subscription {
    /// Starts a new, not yet paid subscription. The window is empty.
    pub fn new(user_id: UserId, product_id: ProductId, now: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            product_id,
            start_date: now,
            end_date: now,
            state: SubscriptionState::Inactive,
            created_at: now,
            modified_at: now,
        }
    }

    /// Payment captured; entitlement grant still outstanding.
    pub fn pre_activate(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.move_to(SubscriptionState::PreActive, now)
    }

    /// Opens a fresh window of `period_days` starting at `now`.
    ///
    /// Late renewals are not back-dated: the window always starts at the
    /// moment of activation.
    pub fn activate(&mut self, period_days: u32, now: Timestamp) -> Result<(), ValidationError> {
        self.move_to(SubscriptionState::Active, now)?;
        self.start_date = now;
        self.end_date = now.add_days(i64::from(period_days));
        Ok(())
    }

    /// Refund issued; the role stays until the deactivation sweep runs.
    pub fn mark_pending_deactivation(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.move_to(SubscriptionState::ToDeactivate, now)
    }

    /// User-requested termination. The role is revoked later by the sweep.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.move_to(SubscriptionState::Cancelled, now)
    }

    pub fn deactivate(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.move_to(SubscriptionState::Inactive, now)
    }

    /// True if the window has closed on or before `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.end_date.date() <= today
    }

    fn move_to(&mut self, target: SubscriptionState, now: Timestamp) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(target)?;
        self.modified_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription() -> Subscription {
        Subscription::new(UserId::new("user-1").unwrap(), ProductId::new(), Timestamp::now())
    }

    #[test]
    fn new_subscription_is_inactive_with_empty_window() {
        let sub = subscription();
        assert_eq!(sub.state, SubscriptionState::Inactive);
        assert_eq!(sub.start_date, sub.end_date);
    }

    #[test]
    fn activate_opens_window_from_now() {
        let mut sub = subscription();
        sub.pre_activate(Timestamp::now()).unwrap();

        let now = Timestamp::now();
        sub.activate(30, now).unwrap();

        assert_eq!(sub.state, SubscriptionState::Active);
        assert_eq!(sub.start_date, now);
        assert_eq!(sub.end_date, now.add_days(30));
    }

    #[test]
    fn renewal_restarts_window_instead_of_extending() {
        let mut sub = subscription();
        let first = Timestamp::now().minus_days(40);
        sub.activate(30, first).unwrap();

        let late = Timestamp::now();
        sub.activate(30, late).unwrap();

        assert_eq!(sub.end_date, late.add_days(30));
    }

    #[test]
    fn refund_marks_pending_deactivation_only_when_active() {
        let mut sub = subscription();
        assert!(sub.mark_pending_deactivation(Timestamp::now()).is_err());

        sub.activate(30, Timestamp::now()).unwrap();
        sub.mark_pending_deactivation(Timestamp::now()).unwrap();
        assert_eq!(sub.state, SubscriptionState::ToDeactivate);
    }

    #[test]
    fn cancelled_subscription_can_only_be_deactivated() {
        let mut sub = subscription();
        sub.activate(30, Timestamp::now()).unwrap();
        sub.cancel(Timestamp::now()).unwrap();

        assert!(sub.activate(30, Timestamp::now()).is_err());
        sub.deactivate(Timestamp::now()).unwrap();
        assert_eq!(sub.state, SubscriptionState::Inactive);
    }

    #[test]
    fn rejected_transition_leaves_state_untouched() {
        let mut sub = subscription();
        let before = sub.clone();
        assert!(sub.deactivate(Timestamp::now()).is_err());
        assert_eq!(sub, before);
    }

    #[test]
    fn due_when_end_date_reached() {
        let mut sub = subscription();
        sub.activate(30, Timestamp::now().minus_days(30)).unwrap();
        assert!(sub.is_due(Timestamp::now().date()));
        assert!(!sub.is_due(Timestamp::now().minus_days(1).date()));
    }
}
