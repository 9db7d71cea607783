//! Application configuration module
//!
//! Configuration is read from environment variables (and a `.env` file in
//! development) with the `BILLING` prefix; nested values use `__` as the
//! separator.
//!
//! Two roots exist: [`AppConfig`] for the HTTP API and
//! [`SchedulerAppConfig`] for the sweeper, which needs neither Stripe nor
//! the role service.
//!
//! # Example
//!
//! ```no_run
//! use subscription_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod auth;
mod backoff;
mod database;
mod entitlement;
mod error;
mod scheduler;
mod server;
mod stripe;

pub use auth::AuthSettings;
pub use backoff::BackoffSettings;
pub use database::DatabaseConfig;
pub use entitlement::EntitlementSettings;
pub use error::{ConfigError, ValidationError};
pub use scheduler::SchedulerSettings;
pub use server::{Environment, ServerConfig};
pub use stripe::StripeSettings;

use serde::de::DeserializeOwned;
use serde::Deserialize;

const ENV_PREFIX: &str = "BILLING";

/// Reads `.env` if present, then every `BILLING__...` variable.
///
/// `BILLING__SERVER__PORT=8080` becomes `server.port = 8080`.
fn load_from_env<T: DeserializeOwned>() -> Result<T, ConfigError> {
    dotenvy::dotenv().ok();

    let config = config::Config::builder()
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    Ok(config)
}

/// Configuration of the billing API process.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub stripe: StripeSettings,

    pub entitlement: EntitlementSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub backoff: BackoffSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        load_from_env()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let production = self.is_production();
        self.server.validate()?;
        self.database.validate()?;
        self.stripe.validate(production)?;
        self.entitlement.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.backoff.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

/// Configuration of the sweeper process.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerAppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub backoff: BackoffSettings,
}

impl SchedulerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        load_from_env()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.scheduler.validate()?;
        self.backoff.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("BILLING__DATABASE__URL", "postgresql://billing@localhost/billing"),
        ("BILLING__STRIPE__API_KEY", "sk_test_xxx"),
        ("BILLING__ENTITLEMENT__BASE_URL", "http://auth:8000/api/v1/admin/user"),
        ("BILLING__AUTH__PUBKEY_URL", "http://auth:8000/api/v1/pubkey"),
    ];

    const OPTIONAL_VARS: &[&str] = &[
        "BILLING__SERVER__PORT",
        "BILLING__SERVER__ENVIRONMENT",
        "BILLING__SCHEDULER__DAILY_AT",
        "BILLING__AUTH__DEBUG",
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        for key in OPTIONAL_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    fn api_config_loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config should load");
        assert_eq!(config.database.url, "postgresql://billing@localhost/billing");
        assert_eq!(config.stripe.api_key.expose_secret(), "sk_test_xxx");
        assert_eq!(config.stripe.base_url, "https://api.stripe.com/v1");
        assert_eq!(config.server.port, 8787);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_overrides_are_applied() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("BILLING__SERVER__PORT", "3000");
        env::set_var("BILLING__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        // sk_test_ keys are not accepted in production
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn scheduler_config_needs_only_database() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("BILLING__DATABASE__URL", "postgres://localhost/billing");
        env::set_var("BILLING__SCHEDULER__DAILY_AT", "04:15");
        let result = SchedulerAppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.scheduler.daily_at, "04:15");
        assert_eq!(config.scheduler.failed_charge_threshold, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_stripe_section_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("BILLING__DATABASE__URL", "postgres://localhost/billing");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
