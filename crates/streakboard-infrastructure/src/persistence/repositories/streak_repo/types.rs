use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::persistence::RepositoryErrorMapper;
use streakboard_domain::shared::{DomainError, UserId, WorkspaceId};
use streakboard_domain::streak::{LeaderboardEntry, StreakKey, StreakState};

#[derive(FromRow)]
pub(super) struct StreakRow {
    pub workspace_id: String,
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_active_days: i64,
    pub activity_score: f64,
    pub last_active_date: NaiveDate,
    pub updated_at: DateTime<Utc>,
    pub revision: i64,
}

impl StreakRow {
    pub fn into_state(self) -> Result<StreakState, DomainError> {
        let revision = u64::try_from(self.revision).map_err(|_| {
            DomainError::DataIntegrity(format!("Invalid revision {}", self.revision))
        })?;

        let state = StreakState::restore(
            StreakKey::new(
                WorkspaceId::from_string(&self.workspace_id),
                UserId::from_string(&self.user_id),
            ),
            RepositoryErrorMapper::column_to_u32(self.current_streak, "current_streak")?,
            RepositoryErrorMapper::column_to_u32(self.longest_streak, "longest_streak")?,
            RepositoryErrorMapper::column_to_u32(self.total_active_days, "total_active_days")?,
            self.activity_score,
            self.last_active_date,
            self.updated_at,
            revision,
        );

        state.check_invariants()?;
        Ok(state)
    }
}

#[derive(FromRow)]
pub(super) struct LeaderboardRow {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub activity_score: f64,
}

impl LeaderboardRow {
    pub fn into_entry(self) -> Result<LeaderboardEntry, DomainError> {
        Ok(LeaderboardEntry {
            user_id: UserId::from_string(&self.user_id),
            current_streak: RepositoryErrorMapper::column_to_u32(
                self.current_streak,
                "current_streak",
            )?,
            longest_streak: RepositoryErrorMapper::column_to_u32(
                self.longest_streak,
                "longest_streak",
            )?,
            activity_score: self.activity_score,
        })
    }
}
