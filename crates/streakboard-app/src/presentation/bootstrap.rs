use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::application::commands::handlers::*;
use crate::application::queries::StreakQueries;
use crate::application::services::{ActivityRecorder, RecorderSettings};
use crate::application::ResultExt;
use crate::presentation::state::{AppState, CommandHandlers};
use streakboard_domain::shared::{Clock, DomainError, SystemClock};
use streakboard_domain::streak::StreakRepository;
use streakboard_infrastructure::concurrency::KeyLocks;
use streakboard_infrastructure::config::EngineConfig;
use streakboard_infrastructure::persistence::{
    repositories::{InMemoryStreakRepository, SqliteStreakRepository},
    Database,
};

/// Where streaks are kept for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    /// Lives and dies with the process.
    Memory,
}

pub async fn build_app_state(
    config: EngineConfig,
    store: StoreKind,
    clock: Arc<dyn Clock>,
) -> Result<AppState, DomainError> {
    let startup_started_at = Instant::now();

    let repository: Arc<dyn StreakRepository> = match store {
        StoreKind::Sqlite => open_sqlite(&config).await?,
        StoreKind::Memory => {
            info!("Using in-memory streak store");
            Arc::new(InMemoryStreakRepository::new())
        }
    };

    let calendar = config.calendar().to_infra_err()?;
    let locks = Arc::new(KeyLocks::new());

    let recorder = Arc::new(ActivityRecorder::new(
        repository.clone(),
        locks,
        calendar,
        clock.clone(),
        RecorderSettings::from(&config),
    ));
    let queries = Arc::new(StreakQueries::new(
        repository.clone(),
        calendar,
        clock,
        &config,
    ));

    let command_handlers = CommandHandlers {
        record_activity: Arc::new(RecordActivityCommandHandler::new(recorder.clone())),
        reset_streak: Arc::new(ResetStreakCommandHandler::new(recorder)),
    };

    info!(
        utc_offset_minutes = calendar.offset_minutes(),
        elapsed_ms = startup_started_at.elapsed().as_millis() as u64,
        "App state ready"
    );

    Ok(AppState {
        command_handlers,
        queries,
        repository,
        config,
    })
}

pub async fn build_default_app_state(
    config: EngineConfig,
    store: StoreKind,
) -> Result<AppState, DomainError> {
    build_app_state(config, store, Arc::new(SystemClock)).await
}

async fn open_sqlite(config: &EngineConfig) -> Result<Arc<dyn StreakRepository>, DomainError> {
    let db_path = config.database_path.to_str().ok_or_else(|| {
        DomainError::Infrastructure(format!(
            "Database path is not valid UTF-8: {}",
            config.database_path.display()
        ))
    })?;

    info!("Connecting to database at {}", db_path);
    let started_at = Instant::now();
    let database = Database::new(db_path).await?;
    info!(
        "Database connection established ({}ms)",
        started_at.elapsed().as_millis()
    );

    let started_at = Instant::now();
    database.run_migrations().await?;
    info!("Migrations completed ({}ms)", started_at.elapsed().as_millis());

    let pool = Arc::new(database.pool().clone());
    Ok(Arc::new(SqliteStreakRepository::new(pool)))
}
