// Domain layer - Pure streak logic
// No dependencies on infrastructure or presentation layers

pub mod shared;
pub mod streak;

// Re-exports for convenience
pub use shared::{DomainError, UserId, WorkspaceId};
pub use streak::{StreakKey, StreakState};
