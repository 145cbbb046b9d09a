//! Cron trigger computation.
//!
//! Job files use the traditional five-field cron syntax; the `cron`
//! crate wants a leading seconds field, so five-field expressions are
//! normalized before parsing. All evaluation happens in UTC.

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("schedule '{expression}' has no upcoming fire time")]
    NoUpcomingFire { expression: String },
}

pub struct Schedule {
    inner: CronSchedule,
    expression: String,
}

impl Schedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let normalized = normalize_expression(expression)?;
        let inner =
            CronSchedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            inner,
            expression: expression.to_string(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next fire instant strictly after the given time.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner.after(&after).next()
    }

    /// The next `count` fire instants from now, for operator inspection.
    pub fn upcoming(&self, count: usize) -> Vec<DateTime<Utc>> {
        self.inner.upcoming(Utc).take(count).collect()
    }
}

/// Accept five-field crontab syntax alongside the six/seven-field form
/// the `cron` crate parses natively.
fn normalize_expression(expression: &str) -> Result<String, ScheduleError> {
    match expression.split_whitespace().count() {
        5 => Ok(format!("0 {}", expression.trim())),
        6 | 7 => Ok(expression.trim().to_string()),
        n => Err(ScheduleError::InvalidExpression {
            expression: expression.to_string(),
            reason: format!("expected 5 to 7 fields, found {n}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn five_field_expression_parses() {
        assert!(Schedule::parse("0 8,18 * * *").is_ok());
    }

    #[test]
    fn seven_field_expression_parses() {
        assert!(Schedule::parse("0 0 12 * * * *").is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Schedule::parse("not a cron line at all honestly").is_err());
        assert!(Schedule::parse("* *").is_err());
    }

    #[test]
    fn default_schedule_fires_at_eight_and_eighteen_utc() {
        let schedule = Schedule::parse("0 8,18 * * *").unwrap();

        let morning = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let first = schedule.next_after(morning).unwrap();
        assert_eq!(first, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());

        let second = schedule.next_after(first).unwrap();
        assert_eq!(second, Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap());

        let third = schedule.next_after(second).unwrap();
        assert_eq!(third, Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap());
    }

    #[test]
    fn next_after_is_strictly_after() {
        let schedule = Schedule::parse("0 8,18 * * *").unwrap();
        let at_fire = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let next = schedule.next_after(at_fire).unwrap();
        assert!(next > at_fire);
    }

    #[test]
    fn upcoming_returns_requested_count() {
        let schedule = Schedule::parse("0 8,18 * * *").unwrap();
        assert_eq!(schedule.upcoming(4).len(), 4);
    }
}
