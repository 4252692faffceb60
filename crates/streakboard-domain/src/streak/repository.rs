use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::state::{StreakKey, StreakState};
use crate::shared::{DomainError, UserId, WorkspaceId};

/// Outcome of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Applied,
    /// The stored revision no longer matches what the writer read.
    Conflict,
}

/// One row of a workspace leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub activity_score: f64,
}

impl LeaderboardEntry {
    pub fn from_state(state: &StreakState) -> Self {
        Self {
            user_id: state.user_id().clone(),
            current_streak: state.current_streak(),
            longest_streak: state.longest_streak(),
            activity_score: state.activity_score(),
        }
    }

    /// Leaderboard order: score desc, then current streak desc, then user id asc.
    pub fn rank_order(a: &Self, b: &Self) -> Ordering {
        b.activity_score
            .total_cmp(&a.activity_score)
            .then_with(|| b.current_streak.cmp(&a.current_streak))
            .then_with(|| a.user_id.cmp(&b.user_id))
    }
}

/// Persistence of streak state keyed by (workspace, user).
#[async_trait]
pub trait StreakRepository: Send + Sync {
    /// Load the state for a key. Absence is not an error.
    async fn find(&self, key: &StreakKey) -> Result<Option<StreakState>, DomainError>;

    /// Atomic conditional full replace.
    ///
    /// With `expected_revision == None` the row is inserted only if no row
    /// exists for the key; otherwise it is replaced only if the stored
    /// revision still equals `expected_revision`.
    async fn upsert(
        &self,
        state: &StreakState,
        expected_revision: Option<u64>,
    ) -> Result<SaveOutcome, DomainError>;

    /// Zero the current streak and recompute the score, keeping history counters.
    /// Returns `false` when no record exists.
    async fn reset(&self, key: &StreakKey, at: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Top `limit` entries of a workspace in [`LeaderboardEntry::rank_order`].
    async fn leaderboard(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DomainError>;

    /// All records of a workspace ordered by user id.
    async fn list_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<StreakState>, DomainError>;

    /// Remove a member's record (membership removal).
    async fn delete(&self, key: &StreakKey) -> Result<bool, DomainError>;

    /// Remove every record of a workspace. Returns the number of removed rows.
    async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> Result<u64, DomainError>;
}
