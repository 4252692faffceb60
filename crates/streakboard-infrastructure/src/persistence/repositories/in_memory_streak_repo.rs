use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use streakboard_domain::shared::{DomainError, WorkspaceId};
use streakboard_domain::streak::{
    LeaderboardEntry, SaveOutcome, StreakKey, StreakRepository, StreakState,
};

/// Process-local store with the same conditional-write semantics as SQLite.
#[derive(Default)]
pub struct InMemoryStreakRepository {
    streaks: RwLock<HashMap<StreakKey, StreakState>>,
}

impl InMemoryStreakRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreakRepository for InMemoryStreakRepository {
    async fn find(&self, key: &StreakKey) -> Result<Option<StreakState>, DomainError> {
        Ok(self.streaks.read().await.get(key).cloned())
    }

    async fn upsert(
        &self,
        state: &StreakState,
        expected_revision: Option<u64>,
    ) -> Result<SaveOutcome, DomainError> {
        let mut streaks = self.streaks.write().await;
        let stored_revision = streaks.get(state.key()).map(StreakState::revision);

        if stored_revision != expected_revision {
            return Ok(SaveOutcome::Conflict);
        }

        streaks.insert(state.key().clone(), state.clone());
        Ok(SaveOutcome::Applied)
    }

    async fn reset(&self, key: &StreakKey, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut streaks = self.streaks.write().await;
        match streaks.get_mut(key) {
            Some(state) => {
                *state = state.reset(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn leaderboard(
        &self,
        workspace_id: &WorkspaceId,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DomainError> {
        let streaks = self.streaks.read().await;
        let mut entries: Vec<LeaderboardEntry> = streaks
            .values()
            .filter(|s| s.workspace_id() == workspace_id)
            .map(LeaderboardEntry::from_state)
            .collect();

        entries.sort_by(LeaderboardEntry::rank_order);
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn list_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<StreakState>, DomainError> {
        let streaks = self.streaks.read().await;
        let mut states: Vec<StreakState> = streaks
            .values()
            .filter(|s| s.workspace_id() == workspace_id)
            .cloned()
            .collect();

        states.sort_by(|a, b| a.user_id().cmp(b.user_id()));
        Ok(states)
    }

    async fn delete(&self, key: &StreakKey) -> Result<bool, DomainError> {
        Ok(self.streaks.write().await.remove(key).is_some())
    }

    async fn delete_workspace(&self, workspace_id: &WorkspaceId) -> Result<u64, DomainError> {
        let mut streaks = self.streaks.write().await;
        let before = streaks.len();
        streaks.retain(|key, _| key.workspace_id() != workspace_id);
        Ok((before - streaks.len()) as u64)
    }
}
