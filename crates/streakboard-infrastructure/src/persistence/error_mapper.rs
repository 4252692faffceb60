use streakboard_domain::shared::DomainError;
use tracing::warn;

/// Primary SQLite result codes that mean "another writer holds the lock".
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Translates storage errors into domain errors.
pub struct RepositoryErrorMapper;

impl RepositoryErrorMapper {
    pub fn map_sqlx_error(err: sqlx::Error, context: &str) -> DomainError {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => {
                warn!(context, error = %err, "storage unavailable");
                DomainError::Unavailable(format!("{}: {}", context, err))
            }
            sqlx::Error::Database(db_err) if Self::is_busy_or_locked(db_err.code().as_deref()) => {
                DomainError::Conflict(format!("{}: {}", context, err))
            }
            _ => DomainError::Repository(format!("{}: {}", context, err)),
        }
    }

    fn is_busy_or_locked(code: Option<&str>) -> bool {
        code.and_then(|c| c.parse::<i32>().ok())
            // extended codes carry the primary code in the low byte
            .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false)
    }

    /// Narrow a stored integer column back into a counter.
    pub fn column_to_u32(value: i64, column: &str) -> Result<u32, DomainError> {
        u32::try_from(value).map_err(|_| {
            DomainError::DataIntegrity(format!(
                "Column {} holds out-of-range value {}",
                column, value
            ))
        })
    }
}
