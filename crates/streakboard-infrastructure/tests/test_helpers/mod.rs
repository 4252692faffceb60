#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use streakboard_domain::streak::StreakKey;
use streakboard_infrastructure::persistence::repositories::SqliteStreakRepository;
use streakboard_infrastructure::persistence::Database;

/// Fresh migrated in-memory database, one connection.
pub async fn setup_in_memory_db() -> SqlitePool {
    let db = Database::in_memory().await.expect("Open in-memory db");
    db.run_migrations().await.expect("Run migrations");
    db.pool().clone()
}

/// Migrated file-backed database, for tests that need several connections.
pub async fn setup_file_db(dir: &Path) -> SqlitePool {
    let path = dir.join("streaks.db");
    let db = Database::new(path.to_str().expect("utf-8 temp path"))
        .await
        .expect("Open file db");
    db.run_migrations().await.expect("Run migrations");
    db.pool().clone()
}

pub async fn in_memory_repo() -> SqliteStreakRepository {
    SqliteStreakRepository::new(Arc::new(setup_in_memory_db().await))
}

pub fn key(workspace: &str, user: &str) -> StreakKey {
    StreakKey::parse(workspace, user).expect("valid key")
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"))
}
