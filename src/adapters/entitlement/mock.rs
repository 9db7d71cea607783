//! In-memory role service for tests and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::ports::{EntitlementError, EntitlementService, GrantOutcome, RevokeOutcome};

/// Tracks granted roles per user.
///
/// Unknown roles answer `NotFound`; every role is known unless restricted
/// with [`MockEntitlementService::with_known_roles`].
#[derive(Default, Clone)]
pub struct MockEntitlementService {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    granted: HashMap<UserId, HashSet<String>>,
    known_roles: Option<HashSet<String>>,
    unavailable: bool,
    grant_calls: usize,
    revoke_calls: usize,
}

impl MockEntitlementService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_known_roles(self, roles: &[&str]) -> Self {
        self.state().known_roles = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn with_role(self, user_id: &UserId, role_id: &str) -> Self {
        self.state()
            .granted
            .entry(user_id.clone())
            .or_default()
            .insert(role_id.to_string());
        self
    }

    /// Makes every call fail as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn has_role(&self, user_id: &UserId, role_id: &str) -> bool {
        self.state()
            .granted
            .get(user_id)
            .map(|roles| roles.contains(role_id))
            .unwrap_or(false)
    }

    pub fn grant_calls(&self) -> usize {
        self.state().grant_calls
    }

    pub fn revoke_calls(&self) -> usize {
        self.state().revoke_calls
    }
}

impl MockState {
    fn check(&self, role_id: &str) -> Result<bool, EntitlementError> {
        if self.unavailable {
            return Err(EntitlementError::Unavailable("mock offline".to_string()));
        }
        Ok(self
            .known_roles
            .as_ref()
            .map(|known| known.contains(role_id))
            .unwrap_or(true))
    }
}

#[async_trait]
impl EntitlementService for MockEntitlementService {
    async fn grant_role(&self, user_id: &UserId, role_id: &str) -> Result<GrantOutcome, EntitlementError> {
        let mut state = self.state();
        state.grant_calls += 1;
        if !state.check(role_id)? {
            return Ok(GrantOutcome::NotFound);
        }

        let inserted = state
            .granted
            .entry(user_id.clone())
            .or_default()
            .insert(role_id.to_string());
        Ok(if inserted {
            GrantOutcome::Granted
        } else {
            GrantOutcome::Conflict
        })
    }

    async fn revoke_role(&self, user_id: &UserId, role_id: &str) -> Result<RevokeOutcome, EntitlementError> {
        let mut state = self.state();
        state.revoke_calls += 1;
        if !state.check(role_id)? {
            return Ok(RevokeOutcome::NotFound);
        }

        if let Some(roles) = state.granted.get_mut(user_id) {
            roles.remove(role_id);
        }
        Ok(RevokeOutcome::Revoked)
    }
}
