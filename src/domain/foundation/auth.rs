//! Authentication types for the domain layer.
//!
//! An [`AuthenticatedUser`] is what the HTTP layer hands to billing handlers
//! once a bearer token has been verified. Billing only needs the subject and,
//! for diagnostics, the role/permission map carried in the `rls` claim.

use std::collections::{BTreeMap, BTreeSet};

use super::UserId;
use thiserror::Error;

/// Authenticated user extracted from a validated JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Subject of the token.
    pub id: UserId,

    /// Role name to permissions granted through that role.
    pub roles: BTreeMap<String, Vec<String>>,
}

impl AuthenticatedUser {
    /// Creates a user with the given role map.
    pub fn new(id: UserId, roles: BTreeMap<String, Vec<String>>) -> Self {
        Self { id, roles }
    }

    /// Creates a user without roles (debug bypass, tests).
    pub fn without_roles(id: UserId) -> Self {
        Self::new(id, BTreeMap::new())
    }

    /// Union of the permissions of every role.
    pub fn permissions(&self) -> BTreeSet<&str> {
        self.roles
            .values()
            .flat_map(|perms| perms.iter().map(String::as_str))
            .collect()
    }

    /// True if the user holds all the listed permissions.
    pub fn has_permissions(&self, required: &[&str]) -> bool {
        let granted = self.permissions();
        required.iter().all(|p| granted.contains(p))
    }

    pub fn is_superuser(&self) -> bool {
        self.roles.contains_key("superuser")
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing, malformed, or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The public key could not be fetched or parsed.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_roles() -> AuthenticatedUser {
        let mut roles = BTreeMap::new();
        roles.insert("subscriber".to_string(), vec!["watch".to_string(), "rate".to_string()]);
        roles.insert("editor".to_string(), vec!["rate".to_string(), "edit".to_string()]);
        AuthenticatedUser::new(UserId::new("user-1").unwrap(), roles)
    }

    #[test]
    fn permissions_are_union_of_roles() {
        let user = user_with_roles();
        let perms: Vec<_> = user.permissions().into_iter().collect();
        assert_eq!(perms, vec!["edit", "rate", "watch"]);
    }

    #[test]
    fn has_permissions_requires_all() {
        let user = user_with_roles();
        assert!(user.has_permissions(&["watch", "edit"]));
        assert!(!user.has_permissions(&["watch", "delete"]));
    }

    #[test]
    fn superuser_detected_by_role_name() {
        let mut user = user_with_roles();
        assert!(!user.is_superuser());
        user.roles.insert("superuser".to_string(), vec![]);
        assert!(user.is_superuser());
    }

    #[test]
    fn only_service_unavailable_is_transient() {
        assert!(AuthError::service_unavailable("down").is_transient());
        assert!(!AuthError::InvalidToken.is_transient());
        assert!(!AuthError::TokenExpired.is_transient());
    }
}
