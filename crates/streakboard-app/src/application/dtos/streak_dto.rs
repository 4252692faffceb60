use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::services::RecordOutcome;
use streakboard_domain::streak::{LeaderboardEntry, StreakState, TransitionKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreakDto {
    pub workspace_id: String,
    pub user_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_active_days: u32,
    pub activity_score: f64,
    pub last_active_date: String, // YYYY-MM-DD
    pub updated_at: String,       // RFC 3339
    pub revision: u64,
    /// Already counted for `today`.
    pub active_today: bool,
    /// Active yesterday but not yet today; the run breaks at day end.
    pub at_risk: bool,
    /// Current streak as of `today`, zero once a whole day has been missed.
    pub effective_streak: u32,
}

impl StreakDto {
    pub fn from_state(state: &StreakState, today: NaiveDate) -> Self {
        let days_since = (today - state.last_active_date()).num_days();
        let active_today = days_since == 0;
        let run_alive = days_since <= 1;

        Self {
            workspace_id: state.workspace_id().as_str().to_string(),
            user_id: state.user_id().as_str().to_string(),
            current_streak: state.current_streak(),
            longest_streak: state.longest_streak(),
            total_active_days: state.total_active_days(),
            activity_score: state.activity_score(),
            last_active_date: state.last_active_date().format("%Y-%m-%d").to_string(),
            updated_at: state.updated_at().to_rfc3339(),
            revision: state.revision(),
            active_today,
            at_risk: days_since == 1 && state.current_streak() > 0,
            effective_streak: if run_alive { state.current_streak() } else { 0 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntryDto {
    pub rank: u32,
    pub user_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub activity_score: f64,
}

impl LeaderboardEntryDto {
    pub fn ranked(entries: Vec<LeaderboardEntry>) -> Vec<Self> {
        entries
            .into_iter()
            .zip(1u32..)
            .map(|(entry, rank)| Self {
                rank,
                user_id: entry.user_id.as_str().to_string(),
                current_streak: entry.current_streak,
                longest_streak: entry.longest_streak,
                activity_score: entry.activity_score,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordOutcomeDto {
    /// created, continued, restarted, duplicate or stale_ignored
    pub outcome: String,
    pub missed_days: Option<u32>,
    pub event_date: String,
    pub streak: StreakDto,
}

impl RecordOutcomeDto {
    pub fn new(outcome: &RecordOutcome, today: NaiveDate) -> Self {
        let (label, missed_days) = match outcome {
            RecordOutcome::Recorded { kind, .. } => match kind {
                TransitionKind::Created => ("created", None),
                TransitionKind::Duplicate => ("duplicate", None),
                TransitionKind::Continued => ("continued", None),
                TransitionKind::Restarted { missed_days } => ("restarted", Some(*missed_days)),
            },
            RecordOutcome::StaleIgnored { .. } => ("stale_ignored", None),
        };

        Self {
            outcome: label.to_string(),
            missed_days,
            event_date: outcome.day().format("%Y-%m-%d").to_string(),
            streak: StreakDto::from_state(outcome.state(), today),
        }
    }
}
