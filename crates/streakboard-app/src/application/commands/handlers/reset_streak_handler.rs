use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::application::commands::command_handler::CommandHandler;
use crate::application::commands::streak_commands::*;
use crate::application::services::ActivityRecorder;
use streakboard_domain::shared::DomainError;
use streakboard_domain::streak::StreakKey;

/// Reset streak command handler
pub struct ResetStreakCommandHandler {
    recorder: Arc<ActivityRecorder>,
}

impl ResetStreakCommandHandler {
    pub fn new(recorder: Arc<ActivityRecorder>) -> Self {
        Self { recorder }
    }
}

#[async_trait]
impl CommandHandler<ResetStreakCommand> for ResetStreakCommandHandler {
    type Result = ResetStreakResult;

    async fn handle(&self, cmd: ResetStreakCommand) -> Result<Self::Result, DomainError> {
        let key = StreakKey::parse(&cmd.workspace_id, &cmd.user_id)?;
        let reset = self.recorder.reset(&key).await?;

        info!("Streak reset for {} (existing record: {})", key, reset);

        Ok(ResetStreakResult {
            workspace_id: key.workspace_id().to_string(),
            user_id: key.user_id().to_string(),
            reset,
        })
    }
}
