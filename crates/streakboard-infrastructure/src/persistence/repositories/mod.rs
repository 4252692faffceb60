pub mod in_memory_streak_repo;
pub mod streak_repo;

pub use in_memory_streak_repo::InMemoryStreakRepository;
pub use streak_repo::SqliteStreakRepository;
