//! Mock and debug session validators.
//!
//! # Example
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_user("valid-token", AuthenticatedUser::without_roles(UserId::new("user-1")?));
//!
//! let result = validator.validate("valid-token").await;
//! assert!(result.is_ok());
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::SessionValidator;

/// Mock session validator for testing.
///
/// Stores a map of tokens to users. Tokens not in the map return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation when set.
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.into(), user);
        self
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(PoisonError::into_inner) = Some(error);
        self
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }

        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Accepts any token as the configured debug user.
///
/// Only for non-production environments; configuration validation refuses
/// debug auth in production.
#[derive(Debug, Clone)]
pub struct DebugSessionValidator {
    user: AuthenticatedUser,
}

impl DebugSessionValidator {
    pub fn new(user: AuthenticatedUser) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }
}

#[async_trait]
impl SessionValidator for DebugSessionValidator {
    async fn validate(&self, _token: &str) -> Result<AuthenticatedUser, AuthError> {
        Ok(self.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn test_user() -> AuthenticatedUser {
        AuthenticatedUser::without_roles(UserId::new("user-123").unwrap())
    }

    #[tokio::test]
    async fn mock_validator_returns_user_for_registered_token() {
        let validator = MockSessionValidator::new().with_user("valid-token", test_user());

        let user = validator.validate("valid-token").await.unwrap();

        assert_eq!(user.id.as_str(), "user-123");
    }

    #[tokio::test]
    async fn mock_validator_rejects_unknown_token() {
        let validator = MockSessionValidator::new();
        assert!(matches!(
            validator.validate("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn forced_error_wins_over_registered_token() {
        let validator = MockSessionValidator::new()
            .with_user("valid-token", test_user())
            .with_error(AuthError::TokenExpired);

        assert!(matches!(
            validator.validate("valid-token").await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn debug_validator_accepts_anything() {
        let validator = DebugSessionValidator::new(test_user());
        assert_eq!(validator.validate("").await.unwrap(), test_user());
    }
}
