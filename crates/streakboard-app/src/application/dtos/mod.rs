mod streak_dto;

pub use streak_dto::{LeaderboardEntryDto, RecordOutcomeDto, StreakDto};
