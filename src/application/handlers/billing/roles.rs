//! Entitlement calls shared by the activation and deactivation handlers.

use crate::domain::billing::{BillingError, Product};
use crate::domain::foundation::UserId;
use crate::ports::{EntitlementError, EntitlementService, GrantOutcome, RevokeOutcome};

impl From<EntitlementError> for BillingError {
    fn from(err: EntitlementError) -> Self {
        BillingError::entitlement(err.to_string())
    }
}

/// Grants the product's role. A user who already holds it counts as granted.
pub(super) async fn grant_product_role(
    entitlements: &dyn EntitlementService,
    user_id: &UserId,
    product: &Product,
) -> Result<(), BillingError> {
    match entitlements.grant_role(user_id, &product.role_id).await? {
        GrantOutcome::Granted => {
            tracing::info!(user_id = %user_id, role_id = %product.role_id, "Role granted");
            Ok(())
        }
        GrantOutcome::Conflict => {
            tracing::info!(
                user_id = %user_id,
                role_id = %product.role_id,
                "User already holds role"
            );
            Ok(())
        }
        GrantOutcome::NotFound => {
            tracing::error!(user_id = %user_id, role_id = %product.role_id, "User or role not found");
            Err(BillingError::EntitlementTargetNotFound {
                user_id: user_id.clone(),
                role_id: product.role_id.clone(),
            })
        }
    }
}

pub(super) async fn revoke_product_role(
    entitlements: &dyn EntitlementService,
    user_id: &UserId,
    product: &Product,
) -> Result<(), BillingError> {
    match entitlements.revoke_role(user_id, &product.role_id).await? {
        RevokeOutcome::Revoked => {
            tracing::info!(user_id = %user_id, role_id = %product.role_id, "Role revoked");
            Ok(())
        }
        RevokeOutcome::NotFound => {
            tracing::error!(user_id = %user_id, role_id = %product.role_id, "User or role not found");
            Err(BillingError::EntitlementTargetNotFound {
                user_id: user_id.clone(),
                role_id: product.role_id.clone(),
            })
        }
    }
}
