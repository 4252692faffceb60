use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::DomainError;

/// Widest real-world UTC offset (UTC+14 / UTC-12 fit inside it).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// When an activity happened, as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivitySignal {
    /// The activity is happening right now.
    Now,
    /// The activity happened at this instant.
    At(DateTime<Utc>),
    /// The caller already knows the reference-calendar day.
    OnDay(NaiveDate),
}

/// Reference calendar used to turn instants into activity days.
///
/// Every host resolves days against the same fixed UTC offset, never the
/// server's local zone. A fixed offset has no daylight-saving transitions,
/// so a day is always exactly 24 hours long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityCalendar {
    offset: FixedOffset,
}

impl ActivityCalendar {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn from_offset_minutes(minutes: i32) -> Result<Self, DomainError> {
        if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(DomainError::Validation(format!(
                "UTC offset {minutes} minutes is outside ±{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        let offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
            DomainError::Validation(format!("Invalid UTC offset: {minutes} minutes"))
        })?;
        Ok(Self { offset })
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Calendar day of `at` in the reference calendar.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Resolve a signal to its activity day, rejecting days after `now`'s day.
    pub fn resolve(
        &self,
        signal: ActivitySignal,
        now: DateTime<Utc>,
    ) -> Result<NaiveDate, DomainError> {
        let today = self.day_of(now);
        let day = match signal {
            ActivitySignal::Now => today,
            ActivitySignal::At(at) => self.day_of(at),
            ActivitySignal::OnDay(day) => day,
        };

        if day > today {
            return Err(DomainError::Validation(format!(
                "Event date {day} is in the future (today is {today})"
            )));
        }

        Ok(day)
    }
}

impl Default for ActivityCalendar {
    fn default() -> Self {
        Self::utc()
    }
}
