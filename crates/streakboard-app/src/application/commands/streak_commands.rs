use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::application::commands::command_handler::Command;
use crate::application::dtos::RecordOutcomeDto;
use streakboard_domain::shared::DomainError;
use streakboard_domain::streak::ActivitySignal;

// ============================================================
// Record Activity Command
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActivityCommand {
    pub workspace_id: String,
    pub user_id: String,
    /// Calendar day, YYYY-MM-DD
    pub event_date: Option<String>,
    /// Instant, RFC 3339
    pub occurred_at: Option<String>,
}

impl Command for RecordActivityCommand {}

pub type RecordActivityResult = RecordOutcomeDto;

impl RecordActivityCommand {
    /// With neither field set the activity counts as happening now.
    pub fn signal(&self) -> Result<ActivitySignal, DomainError> {
        match (self.event_date.as_deref(), self.occurred_at.as_deref()) {
            (Some(_), Some(_)) => Err(DomainError::Validation(
                "Give either event_date or occurred_at, not both".to_string(),
            )),
            (Some(date), None) => NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .map(ActivitySignal::OnDay)
                .map_err(|e| DomainError::Validation(format!("Invalid event_date {date:?}: {e}"))),
            (None, Some(at)) => DateTime::parse_from_rfc3339(at.trim())
                .map(|at| ActivitySignal::At(at.with_timezone(&Utc)))
                .map_err(|e| DomainError::Validation(format!("Invalid occurred_at {at:?}: {e}"))),
            (None, None) => Ok(ActivitySignal::Now),
        }
    }
}

// ============================================================
// Reset Streak Command
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetStreakCommand {
    pub workspace_id: String,
    pub user_id: String,
}

impl Command for ResetStreakCommand {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResetStreakResult {
    pub workspace_id: String,
    pub user_id: String,
    /// False when the user had no streak record.
    pub reset: bool,
}
