use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::persistence::RepositoryErrorMapper;
use streakboard_domain::shared::{DomainError, WorkspaceId};
use streakboard_domain::streak::{SaveOutcome, StreakKey, StreakState};

fn revision_param(revision: u64) -> Result<i64, DomainError> {
    i64::try_from(revision)
        .map_err(|_| DomainError::DataIntegrity(format!("Revision {} overflows storage", revision)))
}

impl super::SqliteStreakRepository {
    pub(super) async fn upsert_impl(
        &self,
        state: &StreakState,
        expected_revision: Option<u64>,
    ) -> Result<SaveOutcome, DomainError> {
        let result = match expected_revision {
            None => {
                // Insert only if nobody created the row in the meantime
                let query = r#"
                    INSERT INTO streaks (
                        workspace_id, user_id, current_streak, longest_streak,
                        total_active_days, activity_score, last_active_date,
                        updated_at, revision
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(workspace_id, user_id) DO NOTHING
                "#;

                sqlx::query(query)
                    .bind(state.workspace_id().as_str())
                    .bind(state.user_id().as_str())
                    .bind(i64::from(state.current_streak()))
                    .bind(i64::from(state.longest_streak()))
                    .bind(i64::from(state.total_active_days()))
                    .bind(state.activity_score())
                    .bind(state.last_active_date())
                    .bind(state.updated_at())
                    .bind(revision_param(state.revision())?)
                    .execute(&*self.pool)
                    .await
                    .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "Insert streak"))?
            }
            Some(expected) => {
                let query = r#"
                    UPDATE streaks SET
                        current_streak = ?3,
                        longest_streak = ?4,
                        total_active_days = ?5,
                        activity_score = ?6,
                        last_active_date = ?7,
                        updated_at = ?8,
                        revision = ?9
                    WHERE workspace_id = ?1 AND user_id = ?2 AND revision = ?10
                "#;

                sqlx::query(query)
                    .bind(state.workspace_id().as_str())
                    .bind(state.user_id().as_str())
                    .bind(i64::from(state.current_streak()))
                    .bind(i64::from(state.longest_streak()))
                    .bind(i64::from(state.total_active_days()))
                    .bind(state.activity_score())
                    .bind(state.last_active_date())
                    .bind(state.updated_at())
                    .bind(revision_param(state.revision())?)
                    .bind(revision_param(expected)?)
                    .execute(&*self.pool)
                    .await
                    .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "Update streak"))?
            }
        };

        let outcome = if result.rows_affected() == 1 {
            SaveOutcome::Applied
        } else {
            SaveOutcome::Conflict
        };

        debug!(
            key = %state.key(),
            revision = state.revision(),
            expected_revision = ?expected_revision,
            outcome = ?outcome,
            "upsert streak"
        );

        Ok(outcome)
    }

    pub(super) async fn reset_impl(
        &self,
        key: &StreakKey,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        // With current_streak = 0 the score formula reduces to total_active_days
        let query = r#"
            UPDATE streaks SET
                current_streak = 0,
                activity_score = CAST(total_active_days AS REAL),
                updated_at = ?3,
                revision = revision + 1
            WHERE workspace_id = ?1 AND user_id = ?2
        "#;

        let result = sqlx::query(query)
            .bind(key.workspace_id().as_str())
            .bind(key.user_id().as_str())
            .bind(at)
            .execute(&*self.pool)
            .await
            .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "Reset streak"))?;

        let found = result.rows_affected() > 0;
        info!(key = %key, found, "reset streak");
        Ok(found)
    }

    pub(super) async fn delete_impl(&self, key: &StreakKey) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM streaks WHERE workspace_id = ?1 AND user_id = ?2")
            .bind(key.workspace_id().as_str())
            .bind(key.user_id().as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "Delete streak"))?;

        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_workspace_impl(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM streaks WHERE workspace_id = ?1")
            .bind(workspace_id.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| RepositoryErrorMapper::map_sqlx_error(e, "Delete workspace streaks"))?;

        info!(
            workspace_id = %workspace_id,
            removed = result.rows_affected(),
            "delete workspace streaks"
        );
        Ok(result.rows_affected())
    }
}
