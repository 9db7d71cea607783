//! Saved payment instruments.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentMethodId, Timestamp, UserId};

use super::PaymentSystem;

/// Tokenized instrument captured from a settled charge.
///
/// `display_data` holds only what the client shows (brand, last four
/// digits, expiry). Raw card data never reaches billing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub user_id: UserId,
    /// Gateway token.
    pub external_id: String,
    pub payment_system: PaymentSystem,
    /// Instrument kind as reported by the gateway, e.g. `card`.
    pub method_type: String,
    pub is_default: bool,
    pub display_data: serde_json::Value,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl PaymentMethod {
    /// Builds a method that will become the user's default once saved.
    pub fn new_default(
        user_id: UserId,
        external_id: impl Into<String>,
        payment_system: PaymentSystem,
        method_type: impl Into<String>,
        display_data: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentMethodId::new(),
            user_id,
            external_id: external_id.into(),
            payment_system,
            method_type: method_type.into(),
            is_default: true,
            display_data,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Applies the single-default rule to a user's methods.
///
/// The method whose `external_id` matches `chosen` becomes the default and
/// every other method is demoted. Returns the ids whose flag changed.
pub fn promote_default(methods: &mut [PaymentMethod], chosen: &str, now: Timestamp) -> Vec<PaymentMethodId> {
    let mut changed = Vec::new();
    for method in methods.iter_mut() {
        let should_be_default = method.external_id == chosen;
        if method.is_default != should_be_default {
            method.is_default = should_be_default;
            method.modified_at = now;
            changed.push(method.id);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn method(external_id: &str, is_default: bool) -> PaymentMethod {
        let mut pm = PaymentMethod::new_default(
            UserId::new("user-1").unwrap(),
            external_id,
            PaymentSystem::Stripe,
            "card",
            json!({"brand": "visa", "last4": "4242"}),
            Timestamp::now(),
        );
        pm.is_default = is_default;
        pm
    }

    #[test]
    fn new_method_is_default() {
        assert!(method("pm_1", true).is_default);
    }

    #[test]
    fn promote_default_leaves_exactly_one_default() {
        let mut methods = vec![method("pm_1", true), method("pm_2", false), method("pm_3", false)];

        let changed = promote_default(&mut methods, "pm_3", Timestamp::now());

        assert_eq!(changed.len(), 2);
        let defaults: Vec<_> = methods.iter().filter(|m| m.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].external_id, "pm_3");
    }

    #[test]
    fn promoting_current_default_changes_nothing() {
        let mut methods = vec![method("pm_1", true), method("pm_2", false)];
        assert!(promote_default(&mut methods, "pm_1", Timestamp::now()).is_empty());
    }
}
