//! Authentication configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::{check_url, ValidationError};
use super::server::Environment;

/// How user requests are authenticated.
///
/// With `debug` on, every request runs as `debug_user_id` and no token is
/// checked. Otherwise bearer tokens are verified against the key published
/// at `pubkey_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_debug_user_id")]
    pub debug_user_id: String,

    #[serde(default)]
    pub pubkey_url: Option<String>,

    #[serde(default = "default_pubkey_cache")]
    pub pubkey_cache_secs: u64,
}

impl AuthSettings {
    pub fn pubkey_cache_duration(&self) -> Duration {
        Duration::from_secs(self.pubkey_cache_secs)
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.debug {
            if *environment == Environment::Production {
                return Err(ValidationError::DebugAuthInProduction);
            }
            if self.debug_user_id.trim().is_empty() {
                return Err(ValidationError::MissingRequired("AUTH__DEBUG_USER_ID"));
            }
            return Ok(());
        }

        match self.pubkey_url.as_deref() {
            Some(url) => check_url("AUTH__PUBKEY_URL", url, false),
            None => Err(ValidationError::MissingRequired("AUTH__PUBKEY_URL")),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            debug: false,
            debug_user_id: default_debug_user_id(),
            pubkey_url: None,
            pubkey_cache_secs: default_pubkey_cache(),
        }
    }
}

fn default_debug_user_id() -> String {
    "debug-user".to_string()
}

fn default_pubkey_cache() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_needs_no_key_url() {
        let settings = AuthSettings {
            debug: true,
            ..Default::default()
        };
        assert!(settings.validate(&Environment::Development).is_ok());
    }

    #[test]
    fn debug_mode_is_refused_in_production() {
        let settings = AuthSettings {
            debug: true,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(&Environment::Production),
            Err(ValidationError::DebugAuthInProduction)
        );
    }

    #[test]
    fn token_mode_requires_key_url() {
        let missing = AuthSettings::default();
        assert_eq!(
            missing.validate(&Environment::Staging),
            Err(ValidationError::MissingRequired("AUTH__PUBKEY_URL"))
        );

        let present = AuthSettings {
            pubkey_url: Some("http://auth:8000/api/v1/pubkey".to_string()),
            ..Default::default()
        };
        assert!(present.validate(&Environment::Production).is_ok());
    }
}
