use crate::application::commands::command_handler::CommandHandler;
use crate::application::commands::streak_commands::*;
use crate::application::dtos::{LeaderboardEntryDto, RecordOutcomeDto, StreakDto};
use crate::presentation::error::CommandError;
use crate::presentation::state::AppState;
use serde::Serialize;
use streakboard_domain::shared::WorkspaceId;
use streakboard_domain::streak::StreakKey;
use streakboard_infrastructure::config::EngineConfig;

/// Record one activity signal for a member
pub async fn record_activity(
    state: &AppState,
    workspace_id: String,
    user_id: String,
    event_date: Option<String>,
    occurred_at: Option<String>,
) -> Result<RecordOutcomeDto, CommandError> {
    let command = RecordActivityCommand {
        workspace_id,
        user_id,
        event_date,
        occurred_at,
    };

    state
        .command_handlers
        .record_activity
        .handle(command)
        .await
        .map_err(CommandError::from)
}

pub async fn get_streak(
    state: &AppState,
    workspace_id: String,
    user_id: String,
) -> Result<StreakDto, CommandError> {
    state
        .queries
        .get_streak(&workspace_id, &user_id)
        .await
        .map_err(CommandError::from)?
        .ok_or_else(|| {
            CommandError::not_found(format!("No streak for {}/{}", workspace_id, user_id))
        })
}

pub async fn get_leaderboard(
    state: &AppState,
    workspace_id: String,
    limit: Option<u32>,
) -> Result<Vec<LeaderboardEntryDto>, CommandError> {
    state
        .queries
        .leaderboard(&workspace_id, limit)
        .await
        .map_err(CommandError::from)
}

pub async fn reset_streak(
    state: &AppState,
    workspace_id: String,
    user_id: String,
) -> Result<ResetStreakResult, CommandError> {
    state
        .command_handlers
        .reset_streak
        .handle(ResetStreakCommand {
            workspace_id,
            user_id,
        })
        .await
        .map_err(CommandError::from)
}

pub async fn list_streaks(
    state: &AppState,
    workspace_id: String,
) -> Result<Vec<StreakDto>, CommandError> {
    state
        .queries
        .list_workspace(&workspace_id)
        .await
        .map_err(CommandError::from)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RemovedDto {
    pub workspace_id: String,
    pub user_id: Option<String>,
    pub removed: u64,
}

/// Drop streak data for a departed member, or for a whole workspace.
pub async fn remove_streaks(
    state: &AppState,
    workspace_id: String,
    user_id: Option<String>,
) -> Result<RemovedDto, CommandError> {
    let removed = match user_id.as_deref() {
        Some(user) => {
            let key = StreakKey::parse(&workspace_id, user)?;
            u64::from(state.repository.delete(&key).await?)
        }
        None => {
            let workspace = WorkspaceId::parse(&workspace_id)?;
            state.repository.delete_workspace(&workspace).await?
        }
    };

    Ok(RemovedDto {
        workspace_id,
        user_id,
        removed,
    })
}

pub fn show_config(state: &AppState) -> EngineConfig {
    state.config.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::bootstrap::{build_app_state, StoreKind};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use streakboard_domain::shared::FixedClock;

    async fn memory_state() -> AppState {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap(),
        ));
        build_app_state(EngineConfig::default(), StoreKind::Memory, clock)
            .await
            .unwrap()
    }

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[tokio::test]
    async fn test_record_then_query_and_reset() {
        let state = memory_state().await;

        for date in ["2024-01-18", "2024-01-19", "2024-01-20"] {
            record_activity(&state, s("ws"), s("amy"), Some(s(date)), None)
                .await
                .unwrap();
        }
        record_activity(&state, s("ws"), s("bob"), None, None)
            .await
            .unwrap();

        let amy = get_streak(&state, s("ws"), s("amy")).await.unwrap();
        assert_eq!(amy.current_streak, 3);
        assert!(amy.active_today);

        let board = get_leaderboard(&state, s("ws"), None).await.unwrap();
        assert_eq!(board[0].user_id, "amy");
        assert_eq!(board[1].user_id, "bob");

        let reset = reset_streak(&state, s("ws"), s("amy")).await.unwrap();
        assert!(reset.reset);
        let amy = get_streak(&state, s("ws"), s("amy")).await.unwrap();
        assert_eq!(amy.current_streak, 0);
        assert_eq!(amy.longest_streak, 3);
    }

    #[tokio::test]
    async fn test_missing_streak_is_not_found() {
        let state = memory_state().await;
        let err = get_streak(&state, s("ws"), s("nobody")).await.unwrap_err();
        assert_eq!(err.code, 2001);
    }

    #[tokio::test]
    async fn test_remove_member_and_workspace() {
        let state = memory_state().await;
        for user in ["amy", "bob", "cat"] {
            record_activity(&state, s("ws"), s(user), None, None)
                .await
                .unwrap();
        }

        let removed = remove_streaks(&state, s("ws"), Some(s("bob"))).await.unwrap();
        assert_eq!(removed.removed, 1);

        let removed = remove_streaks(&state, s("ws"), None).await.unwrap();
        assert_eq!(removed.removed, 2);
        assert!(list_streaks(&state, s("ws")).await.unwrap().is_empty());
    }
}
