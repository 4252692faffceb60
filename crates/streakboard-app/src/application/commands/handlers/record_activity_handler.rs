use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::application::commands::command_handler::CommandHandler;
use crate::application::commands::streak_commands::*;
use crate::application::dtos::RecordOutcomeDto;
use crate::application::services::ActivityRecorder;
use streakboard_domain::shared::DomainError;
use streakboard_domain::streak::StreakKey;

/// Record activity command handler
pub struct RecordActivityCommandHandler {
    recorder: Arc<ActivityRecorder>,
}

impl RecordActivityCommandHandler {
    pub fn new(recorder: Arc<ActivityRecorder>) -> Self {
        Self { recorder }
    }
}

#[async_trait]
impl CommandHandler<RecordActivityCommand> for RecordActivityCommandHandler {
    type Result = RecordActivityResult;

    async fn handle(&self, cmd: RecordActivityCommand) -> Result<Self::Result, DomainError> {
        let key = StreakKey::parse(&cmd.workspace_id, &cmd.user_id)?;
        let signal = cmd.signal()?;

        info!("Handling RecordActivityCommand for {}: {:?}", key, signal);

        let outcome = self.recorder.record(&key, signal).await?;
        Ok(RecordOutcomeDto::new(&outcome, self.recorder.today()))
    }
}
