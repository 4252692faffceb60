mod calendar;
mod repository;
mod state;
mod transition;


pub use calendar::{ActivityCalendar, ActivitySignal, MAX_UTC_OFFSET_MINUTES};
pub use repository::{LeaderboardEntry, SaveOutcome, StreakRepository};
pub use state::{activity_score, StreakKey, StreakState};
pub use transition::{StreakEngine, Transition, TransitionKind};
