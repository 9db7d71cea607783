//! Entitlement service port - grants and revokes the role a product unlocks.
//!
//! Expected business outcomes (the user already holds the role, the user or
//! role is unknown) are values of [`GrantOutcome`] / [`RevokeOutcome`], not
//! errors. [`EntitlementError`] is reserved for transport failures that
//! survived the adapter's retries.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;

#[async_trait]
pub trait EntitlementService: Send + Sync {
    async fn grant_role(&self, user_id: &UserId, role_id: &str) -> Result<GrantOutcome, EntitlementError>;

    async fn revoke_role(&self, user_id: &UserId, role_id: &str) -> Result<RevokeOutcome, EntitlementError>;
}

/// Result of a grant request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    /// User already holds the role.
    Conflict,
    /// Unknown user or role.
    NotFound,
}

/// Result of a revoke request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    /// Unknown user or role.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    #[error("entitlement service unreachable: {0}")]
    Unavailable(String),

    #[error("unexpected entitlement service response {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },
}
