use std::time::Instant;
use tracing::debug;

use super::types::{LeaderboardRow, StreakRow};
use crate::persistence::RepositoryErrorMapper;
use streakboard_domain::shared::{DomainError, WorkspaceId};
use streakboard_domain::streak::{LeaderboardEntry, StreakKey, StreakState};

impl super::SqliteStreakRepository {
    pub(super) async fn find_impl(
        &self,
        key: &StreakKey,
    ) -> Result<Option<StreakState>, DomainError> {
        let start = Instant::now();

        let query = format!(
            r#"
            {}
            WHERE workspace_id = ?1 AND user_id = ?2
        "#,
            Self::SELECT_QUERY
        );

        let row: Option<StreakRow> = sqlx::query_as(&query)
            .bind(key.workspace_id().as_str())
            .bind(key.user_id().as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "Find streak"))?;

        debug!(
            key = %key,
            found = row.is_some(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "find streak"
        );

        row.map(StreakRow::into_state).transpose()
    }

    pub(super) async fn leaderboard_impl(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DomainError> {
        let start = Instant::now();

        let query = r#"
            SELECT user_id, current_streak, longest_streak, activity_score
            FROM streaks
            WHERE workspace_id = ?1
            ORDER BY activity_score DESC, current_streak DESC, user_id ASC
            LIMIT ?2
        "#;

        let rows: Vec<LeaderboardRow> = sqlx::query_as(query)
            .bind(workspace_id.as_str())
            .bind(i64::from(limit))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "Load leaderboard"))?;

        debug!(
            workspace_id = %workspace_id,
            limit,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "leaderboard"
        );

        rows.into_iter().map(LeaderboardRow::into_entry).collect()
    }

    pub(super) async fn list_workspace_impl(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<StreakState>, DomainError> {
        let query = format!(
            r#"
            {}
            WHERE workspace_id = ?1
            ORDER BY user_id ASC
        "#,
            Self::SELECT_QUERY
        );

        let rows: Vec<StreakRow> = sqlx::query_as(&query)
            .bind(workspace_id.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "List workspace streaks"))?;

        rows.into_iter().map(StreakRow::into_state).collect()
    }
}
