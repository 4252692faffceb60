use std::sync::Arc;

use crate::application::commands::handlers::*;
use crate::application::queries::StreakQueries;
use streakboard_domain::streak::StreakRepository;
use streakboard_infrastructure::config::EngineConfig;

/// Command handlers container
pub struct CommandHandlers {
    pub record_activity: Arc<RecordActivityCommandHandler>,
    pub reset_streak: Arc<ResetStreakCommandHandler>,
}

pub struct AppState {
    pub command_handlers: CommandHandlers,
    pub queries: Arc<StreakQueries>,
    pub repository: Arc<dyn StreakRepository>,
    pub config: EngineConfig,
}
