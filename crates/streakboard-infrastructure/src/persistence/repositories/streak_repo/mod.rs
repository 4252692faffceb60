mod mutations;
mod queries;
mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use streakboard_domain::shared::{DomainError, WorkspaceId};
use streakboard_domain::streak::{
    LeaderboardEntry, SaveOutcome, StreakKey, StreakRepository, StreakState,
};

/// SQLite implementation of StreakRepository.
///
/// Every write is a single statement, so a dropped future can never leave a
/// half-applied transition behind.
pub struct SqliteStreakRepository {
    pool: Arc<SqlitePool>,
}

impl SqliteStreakRepository {
    const SELECT_QUERY: &'static str = r#"
            SELECT
                workspace_id, user_id, current_streak, longest_streak,
                total_active_days, activity_score, last_active_date,
                updated_at, revision
            FROM streaks
        "#;

    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StreakRepository for SqliteStreakRepository {
    async fn find(&self, key: &StreakKey) -> Result<Option<StreakState>, DomainError> {
        self.find_impl(key).await
    }

    async fn upsert(
        &self,
        state: &StreakState,
        expected_revision: Option<u64>,
    ) -> Result<SaveOutcome, DomainError> {
        self.upsert_impl(state, expected_revision).await
    }

    async fn reset(&self, key: &StreakKey, at: DateTime<Utc>) -> Result<bool, DomainError> {
        self.reset_impl(key, at).await
    }

    async fn leaderboard(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DomainError> {
        self.leaderboard_impl(workspace_id, limit).await
    }

    async fn list_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<StreakState>, DomainError> {
        self.list_workspace_impl(workspace_id).await
    }

    async fn delete(&self, key: &StreakKey) -> Result<bool, DomainError> {
        self.delete_impl(key).await
    }

    async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> Result<u64, DomainError> {
        self.delete_workspace_impl(workspace_id).await
    }
}
