//! Retry backoff for outbound calls

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::reliability::BackoffPolicy;

use super::error::ValidationError;

/// Delay before retry `n` is `factor * base^n` seconds, capped at `max_value`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffSettings {
    #[serde(default = "default_factor")]
    pub factor_secs: u64,

    #[serde(default = "default_base")]
    pub base: u32,

    #[serde(default = "default_max_value")]
    pub max_value_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl BackoffSettings {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            factor: Duration::from_secs(self.factor_secs),
            base: self.base,
            max_delay: Duration::from_secs(self.max_value_secs),
            max_attempts: self.max_attempts,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base < 1 {
            return Err(ValidationError::InvalidBackoff("base must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidBackoff("max_attempts must be positive"));
        }
        if self.max_value_secs < self.factor_secs {
            return Err(ValidationError::InvalidBackoff("max_value is below factor"));
        }
        Ok(())
    }
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            factor_secs: default_factor(),
            base: default_base(),
            max_value_secs: default_max_value(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_factor() -> u64 {
    1
}

fn default_base() -> u32 {
    2
}

fn default_max_value() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}
