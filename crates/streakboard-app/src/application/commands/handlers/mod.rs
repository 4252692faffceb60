mod record_activity_handler;
mod reset_streak_handler;


pub use record_activity_handler::RecordActivityCommandHandler;
pub use reset_streak_handler::ResetStreakCommandHandler;
