use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{DomainError, UserId, WorkspaceId};

/// Stored scores may differ from a recomputation by float noise.
const SCORE_TOLERANCE: f64 = 1e-9;

/// `total_active_days * (1 + current_streak * 0.1)`
///
/// Evaluated in whole tenths so equal scores are bit-identical floats.
pub fn activity_score(total_active_days: u32, current_streak: u32) -> f64 {
    let tenths = u64::from(total_active_days) * (10 + u64::from(current_streak));
    tenths as f64 / 10.0
}

/// Identity of a streak record: one per (workspace, user).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreakKey {
    workspace_id: WorkspaceId,
    user_id: UserId,
}

impl StreakKey {
    pub fn new(workspace_id: WorkspaceId, user_id: UserId) -> Self {
        Self {
            workspace_id,
            user_id,
        }
    }

    /// Parse a key from raw caller input.
    pub fn parse(workspace_id: &str, user_id: &str) -> Result<Self, DomainError> {
        Ok(Self::new(
            WorkspaceId::parse(workspace_id)?,
            UserId::parse(user_id)?,
        ))
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl std::fmt::Display for StreakKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.workspace_id, self.user_id)
    }
}

/// Engagement streak of one user inside one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    key: StreakKey,
    current_streak: u32,
    longest_streak: u32,
    total_active_days: u32,
    activity_score: f64,
    last_active_date: NaiveDate,
    updated_at: DateTime<Utc>,
    revision: u64,
}

impl StreakState {
    /// State produced by the first activity signal for a key.
    pub fn first_activity(key: StreakKey, day: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            key,
            current_streak: 1,
            longest_streak: 1,
            total_active_days: 1,
            activity_score: activity_score(1, 1),
            last_active_date: day,
            updated_at: now,
            revision: 1,
        }
    }

    /// Rebuild a state loaded from persistence without re-deriving anything.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        key: StreakKey,
        current_streak: u32,
        longest_streak: u32,
        total_active_days: u32,
        activity_score: f64,
        last_active_date: NaiveDate,
        updated_at: DateTime<Utc>,
        revision: u64,
    ) -> Self {
        Self {
            key,
            current_streak,
            longest_streak,
            total_active_days,
            activity_score,
            last_active_date,
            updated_at,
            revision,
        }
    }

    pub fn key(&self) -> &StreakKey {
        &self.key
    }

    pub fn workspace_id(&self) -> &WorkspaceId {
        self.key.workspace_id()
    }

    pub fn user_id(&self) -> &UserId {
        self.key.user_id()
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    pub fn total_active_days(&self) -> u32 {
        self.total_active_days
    }

    pub fn activity_score(&self) -> f64 {
        self.activity_score
    }

    pub fn last_active_date(&self) -> NaiveDate {
        self.last_active_date
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Credit `day` as the next active day.
    ///
    /// `continues` selects between extending the current run and starting a
    /// new one after a gap.
    pub(crate) fn credit_day(&self, day: NaiveDate, continues: bool, now: DateTime<Utc>) -> Self {
        let current_streak = if continues {
            self.current_streak.saturating_add(1)
        } else {
            1
        };
        let total_active_days = self.total_active_days.saturating_add(1);
        let longest_streak = self.longest_streak.max(current_streak);

        Self {
            key: self.key.clone(),
            current_streak,
            longest_streak,
            total_active_days,
            activity_score: activity_score(total_active_days, current_streak),
            last_active_date: day,
            updated_at: now,
            revision: self.revision + 1,
        }
    }

    /// Administrative reset: the current streak drops to zero and the score is
    /// recomputed from it; history counters are kept.
    pub fn reset(&self, now: DateTime<Utc>) -> Self {
        Self {
            key: self.key.clone(),
            current_streak: 0,
            longest_streak: self.longest_streak,
            total_active_days: self.total_active_days,
            activity_score: activity_score(self.total_active_days, 0),
            last_active_date: self.last_active_date,
            updated_at: now,
            revision: self.revision + 1,
        }
    }

    /// Verify the counter invariants on a state read back from storage.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.longest_streak < self.current_streak {
            return Err(DomainError::DataIntegrity(format!(
                "{}: longest_streak {} < current_streak {}",
                self.key, self.longest_streak, self.current_streak
            )));
        }
        if self.total_active_days < self.current_streak {
            return Err(DomainError::DataIntegrity(format!(
                "{}: total_active_days {} < current_streak {}",
                self.key, self.total_active_days, self.current_streak
            )));
        }
        let expected = activity_score(self.total_active_days, self.current_streak);
        if (self.activity_score - expected).abs() > SCORE_TOLERANCE {
            return Err(DomainError::DataIntegrity(format!(
                "{}: activity_score {} does not match counters (expected {})",
                self.key, self.activity_score, expected
            )));
        }
        Ok(())
    }
}
