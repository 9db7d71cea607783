//! When a sweep group fires.

use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Fixed interval, first run one interval after start.
    Every(Duration),
    /// Once a day at this UTC wall-clock time.
    DailyAt(NaiveTime),
}

impl Cadence {
    /// The first fire time strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Cadence::Every(interval) => {
                let step = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::zero());
                now + step
            }
            Cadence::DailyAt(time) => {
                let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));
                if today > now {
                    today
                } else {
                    let tomorrow = now.date_naive() + Days::new(1);
                    Utc.from_utc_datetime(&tomorrow.and_time(time))
                }
            }
        }
    }

    /// How long to sleep from `now` until the next fire.
    pub fn wait_from(&self, now: DateTime<Utc>) -> Duration {
        (self.next_run_after(now) - now).to_std().unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn half_past_ten() -> Cadence {
        Cadence::DailyAt(NaiveTime::from_hms_opt(10, 30, 0).unwrap())
    }

    #[test]
    fn interval_fires_one_step_later() {
        let now = at("2024-05-01T08:00:00Z");
        assert_eq!(
            Cadence::Every(Duration::from_secs(5)).next_run_after(now),
            at("2024-05-01T08:00:05Z")
        );
    }

    #[test]
    fn daily_fires_later_today_before_the_time() {
        assert_eq!(
            half_past_ten().next_run_after(at("2024-05-01T08:00:00Z")),
            at("2024-05-01T10:30:00Z")
        );
    }

    #[test]
    fn daily_rolls_to_tomorrow_at_or_after_the_time() {
        assert_eq!(
            half_past_ten().next_run_after(at("2024-05-01T10:30:00Z")),
            at("2024-05-02T10:30:00Z")
        );
        assert_eq!(
            half_past_ten().next_run_after(at("2024-12-31T23:00:00Z")),
            at("2025-01-01T10:30:00Z")
        );
    }

    #[test]
    fn wait_is_distance_to_next_fire() {
        assert_eq!(
            half_past_ten().wait_from(at("2024-05-01T10:00:00Z")),
            Duration::from_secs(30 * 60)
        );
    }
}
