use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::state::{StreakKey, StreakState};
use crate::shared::DomainError;

/// Which branch of the transition rules an activity day took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TransitionKind {
    /// First activity ever recorded for the key.
    Created,
    /// Same day as the last credited day; nothing changes.
    Duplicate,
    /// The day right after the last credited day.
    Continued,
    /// A later day after at least one missed day; the run restarts at 1.
    Restarted { missed_days: u32 },
}

/// Result of applying one activity day to a streak.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    kind: TransitionKind,
    state: StreakState,
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn state(&self) -> &StreakState {
        &self.state
    }

    pub fn into_state(self) -> StreakState {
        self.state
    }

    /// Whether the new state has to be persisted.
    pub fn requires_write(&self) -> bool {
        !matches!(self.kind, TransitionKind::Duplicate)
    }
}

/// Pure streak transition rules. No I/O, no clock access.
pub struct StreakEngine;

impl StreakEngine {
    /// Apply an activity `day` to the `existing` state of `key`.
    ///
    /// `now` only stamps `updated_at`; the decision depends on `day` alone.
    /// A day earlier than the last credited day is rejected with
    /// [`DomainError::StaleEventRejected`] and the stored state must be left
    /// untouched by the caller.
    pub fn transition(
        key: &StreakKey,
        existing: Option<&StreakState>,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Transition, DomainError> {
        let Some(existing) = existing else {
            return Ok(Transition {
                kind: TransitionKind::Created,
                state: StreakState::first_activity(key.clone(), day, now),
            });
        };

        let last = existing.last_active_date();
        let elapsed = (day - last).num_days();

        match elapsed {
            d if d < 0 => Err(DomainError::StaleEventRejected(format!(
                "{}: event day {} precedes last active day {}",
                existing.key(),
                day,
                last
            ))),
            0 => Ok(Transition {
                kind: TransitionKind::Duplicate,
                state: existing.clone(),
            }),
            1 => Ok(Transition {
                kind: TransitionKind::Continued,
                state: existing.credit_day(day, true, now),
            }),
            d => Ok(Transition {
                kind: TransitionKind::Restarted {
                    missed_days: u32::try_from(d - 1).unwrap_or(u32::MAX),
                },
                state: existing.credit_day(day, false, now),
            }),
        }
    }
}
