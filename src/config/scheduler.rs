//! Sweeper configuration

use chrono::NaiveTime;
use serde::Deserialize;
use std::time::Duration;

use super::error::{check_url, ValidationError};

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Service API root, e.g. `http://billing-api:8787/api/service`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Pause between two items of one sweep
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// UTC wall-clock time of the daily renewal and overdue sweeps, `HH:MM`
    #[serde(default = "default_daily_at")]
    pub daily_at: String,

    #[serde(default = "default_order_poll")]
    pub order_poll_secs: u64,

    #[serde(default = "default_activation")]
    pub activation_secs: u64,

    #[serde(default = "default_deactivation")]
    pub deactivation_secs: u64,

    /// Timeout of one service API call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_overdue_order_days")]
    pub overdue_order_days: u32,

    #[serde(default = "default_failed_charge_threshold")]
    pub failed_charge_threshold: u32,

    #[serde(default = "default_failed_charge_window_days")]
    pub failed_charge_window_days: u32,
}

impl SchedulerSettings {
    pub fn daily_time(&self) -> Result<NaiveTime, ValidationError> {
        NaiveTime::parse_from_str(&self.daily_at, "%H:%M").map_err(|_| {
            ValidationError::InvalidSchedule(format!(
                "daily_at must be HH:MM, got {:?}",
                self.daily_at
            ))
        })
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn order_poll_interval(&self) -> Duration {
        Duration::from_secs(self.order_poll_secs)
    }

    pub fn activation_interval(&self) -> Duration {
        Duration::from_secs(self.activation_secs)
    }

    pub fn deactivation_interval(&self) -> Duration {
        Duration::from_secs(self.deactivation_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_url("SCHEDULER__API_BASE_URL", &self.api_base_url, false)?;
        self.daily_time()?;

        let intervals = [
            ("order_poll_secs", self.order_poll_secs),
            ("activation_secs", self.activation_secs),
            ("deactivation_secs", self.deactivation_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, secs)| *secs == 0) {
            return Err(ValidationError::InvalidSchedule(format!(
                "{} must be positive",
                name
            )));
        }
        if self.failed_charge_threshold == 0 {
            return Err(ValidationError::InvalidSchedule(
                "failed_charge_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_delay_ms: default_request_delay(),
            daily_at: default_daily_at(),
            order_poll_secs: default_order_poll(),
            activation_secs: default_activation(),
            deactivation_secs: default_deactivation(),
            request_timeout_secs: default_request_timeout(),
            overdue_order_days: default_overdue_order_days(),
            failed_charge_threshold: default_failed_charge_threshold(),
            failed_charge_window_days: default_failed_charge_window_days(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8787/api/service".to_string()
}

fn default_request_delay() -> u64 {
    1000
}

fn default_daily_at() -> String {
    "10:30".to_string()
}

fn default_order_poll() -> u64 {
    5
}

fn default_activation() -> u64 {
    6
}

fn default_deactivation() -> u64 {
    7
}

fn default_request_timeout() -> u64 {
    30
}

fn default_overdue_order_days() -> u32 {
    10
}

fn default_failed_charge_threshold() -> u32 {
    3
}

fn default_failed_charge_window_days() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = SchedulerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.daily_time().unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap()
        );
    }

    #[test]
    fn malformed_daily_time_is_rejected() {
        let settings = SchedulerSettings {
            daily_at: "half past ten".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let settings = SchedulerSettings {
            activation_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ValidationError::InvalidSchedule(
                "activation_secs must be positive".to_string()
            ))
        );
    }
}
