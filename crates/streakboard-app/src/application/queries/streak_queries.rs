use log::info;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::application::dtos::{LeaderboardEntryDto, StreakDto};
use streakboard_domain::shared::{Clock, DomainError, WorkspaceId};
use streakboard_domain::streak::{ActivityCalendar, StreakKey, StreakRepository};
use streakboard_infrastructure::config::EngineConfig;

/// Read side. Never takes the per-key lock, so readers cannot stall writers.
pub struct StreakQueries {
    repo: Arc<dyn StreakRepository>,
    calendar: ActivityCalendar,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    max_leaderboard_limit: u32,
}

impl StreakQueries {
    pub fn new(
        repo: Arc<dyn StreakRepository>,
        calendar: ActivityCalendar,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            repo,
            calendar,
            clock,
            timeout: config.query_timeout(),
            max_leaderboard_limit: config.max_leaderboard_limit,
        }
    }

    pub async fn get_streak(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<StreakDto>, DomainError> {
        let key = StreakKey::parse(workspace_id, user_id)?;
        let state = self.bounded("get_streak", self.repo.find(&key)).await?;
        let today = self.today();
        Ok(state.map(|s| StreakDto::from_state(&s, today)))
    }

    /// Top entries of a workspace. `None` asks for the configured maximum;
    /// larger requests are clamped to it.
    pub async fn leaderboard(
        &self,
        workspace_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<LeaderboardEntryDto>, DomainError> {
        let workspace_id = WorkspaceId::parse(workspace_id)?;
        let limit = self.effective_limit(limit)?;

        let entries = self
            .bounded("leaderboard", self.repo.leaderboard(&workspace_id, limit))
            .await?;

        info!(
            "[leaderboard] workspace={} limit={} entries={}",
            workspace_id,
            limit,
            entries.len()
        );
        Ok(LeaderboardEntryDto::ranked(entries))
    }

    pub async fn list_workspace(&self, workspace_id: &str) -> Result<Vec<StreakDto>, DomainError> {
        let workspace_id = WorkspaceId::parse(workspace_id)?;
        let states = self
            .bounded("list_workspace", self.repo.list_workspace(&workspace_id))
            .await?;
        let today = self.today();
        Ok(states
            .iter()
            .map(|s| StreakDto::from_state(s, today))
            .collect())
    }

    fn effective_limit(&self, requested: Option<u32>) -> Result<u32, DomainError> {
        match requested {
            Some(0) => Err(DomainError::Validation(
                "Leaderboard limit must be positive".to_string(),
            )),
            Some(n) => Ok(n.min(self.max_leaderboard_limit)),
            None => Ok(self.max_leaderboard_limit),
        }
    }

    fn today(&self) -> chrono::NaiveDate {
        self.calendar.day_of(self.clock.now())
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            DomainError::DeadlineExceeded(format!(
                "{} did not finish within {:?}",
                op, self.timeout
            ))
        })?
    }
}
