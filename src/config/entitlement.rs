//! Role service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::{check_url, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementSettings {
    /// User admin endpoint, e.g. `http://auth:8000/api/v1/admin/user`
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl EntitlementSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The role service sits on the internal network, so plain http is allowed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_url("ENTITLEMENT__BASE_URL", &self.base_url, false)?;
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_request_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_http_url_is_accepted() {
        let settings = EntitlementSettings {
            base_url: "http://auth:8000/api/v1/admin/user".to_string(),
            request_timeout_secs: 10,
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_scheme_is_rejected() {
        let settings = EntitlementSettings {
            base_url: "auth:8000/api/v1/admin/user".to_string(),
            request_timeout_secs: 10,
        };
        assert_eq!(
            settings.validate(),
            Err(ValidationError::InvalidUrl("ENTITLEMENT__BASE_URL"))
        );
    }
}
