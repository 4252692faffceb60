use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use streakboard_domain::shared::{Clock, DomainError};
use streakboard_domain::streak::{
    ActivityCalendar, ActivitySignal, SaveOutcome, StreakEngine, StreakKey, StreakRepository,
    StreakState, TransitionKind,
};
use streakboard_infrastructure::concurrency::KeyLocks;
use streakboard_infrastructure::config::EngineConfig;

/// Backoff never grows past this, whatever the attempt count.
const MAX_BACKOFF_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderSettings {
    /// Conditional-write retries after the first attempt.
    pub max_write_retries: u32,
    pub retry_backoff: Duration,
    /// Deadline for one record or reset call, guard wait included.
    pub timeout: Duration,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RecorderSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_write_retries: config.max_write_retries,
            retry_backoff: config.retry_backoff(),
            timeout: config.record_timeout(),
        }
    }
}

/// What a record call did to the stored streak.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The engine accepted the day. `Duplicate` means nothing was written.
    Recorded {
        kind: TransitionKind,
        day: NaiveDate,
        state: StreakState,
    },
    /// The day precedes the stored last active day and was dropped.
    StaleIgnored { day: NaiveDate, state: StreakState },
}

impl RecordOutcome {
    pub fn state(&self) -> &StreakState {
        match self {
            RecordOutcome::Recorded { state, .. } | RecordOutcome::StaleIgnored { state, .. } => {
                state
            }
        }
    }

    pub fn day(&self) -> NaiveDate {
        match self {
            RecordOutcome::Recorded { day, .. } | RecordOutcome::StaleIgnored { day, .. } => *day,
        }
    }
}

/// Write path for streaks: resolve the day, serialize on the key, run the
/// engine, and persist with a revision check.
pub struct ActivityRecorder {
    repo: Arc<dyn StreakRepository>,
    locks: Arc<KeyLocks<StreakKey>>,
    calendar: ActivityCalendar,
    clock: Arc<dyn Clock>,
    settings: RecorderSettings,
}

impl ActivityRecorder {
    pub fn new(
        repo: Arc<dyn StreakRepository>,
        locks: Arc<KeyLocks<StreakKey>>,
        calendar: ActivityCalendar,
        clock: Arc<dyn Clock>,
        settings: RecorderSettings,
    ) -> Self {
        Self {
            repo,
            locks,
            calendar,
            clock,
            settings,
        }
    }

    /// Today in the reference calendar.
    pub fn today(&self) -> NaiveDate {
        self.calendar.day_of(self.clock.now())
    }

    pub async fn record(
        &self,
        key: &StreakKey,
        signal: ActivitySignal,
    ) -> Result<RecordOutcome, DomainError> {
        let now = self.clock.now();
        let day = self.calendar.resolve(signal, now)?;

        self.with_deadline("record", key, self.record_day(key, day, now))
            .await
    }

    /// Fire-and-forget recording. Failures are logged, never returned.
    pub fn record_detached(
        self: &Arc<Self>,
        key: StreakKey,
        signal: ActivitySignal,
    ) -> JoinHandle<()> {
        let recorder = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = recorder.record(&key, signal).await {
                error!(
                    key = %key,
                    code = e.code().code(),
                    error = %e,
                    "Detached activity recording failed"
                );
            }
        })
    }

    /// Zero the current streak. Returns false when no record exists.
    pub async fn reset(&self, key: &StreakKey) -> Result<bool, DomainError> {
        self.with_deadline("reset", key, async {
            let _guard = self.locks.acquire(key).await;
            let found = self.repo.reset(key, self.clock.now()).await?;
            if !found {
                debug!(key = %key, "Reset requested for unknown streak");
            }
            Ok(found)
        })
        .await
    }

    async fn with_deadline<T, F>(
        &self,
        op: &str,
        key: &StreakKey,
        fut: F,
    ) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.settings.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    key = %key,
                    op,
                    timeout_ms = self.settings.timeout.as_millis() as u64,
                    "Deadline exceeded"
                );
                Err(DomainError::DeadlineExceeded(format!(
                    "{} {} did not finish within {:?}",
                    op, key, self.settings.timeout
                )))
            }
        }
    }

    async fn record_day(
        &self,
        key: &StreakKey,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, DomainError> {
        let _guard = self.locks.acquire(key).await;
        let mut retries = 0u32;

        loop {
            let existing = match self.repo.find(key).await {
                Ok(existing) => existing,
                // a locked database is contention too
                Err(DomainError::Conflict(msg)) => {
                    debug!(key = %key, error = %msg, "Read contention");
                    retries += 1;
                    self.pause_before_retry(key, retries).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let transition = match StreakEngine::transition(key, existing.as_ref(), day, now) {
                Ok(transition) => transition,
                Err(DomainError::StaleEventRejected(reason)) => {
                    return match existing {
                        Some(state) => {
                            warn!(
                                key = %key,
                                day = %day,
                                reason = %reason,
                                "Ignoring stale activity"
                            );
                            Ok(RecordOutcome::StaleIgnored { day, state })
                        }
                        None => Err(DomainError::StaleEventRejected(reason)),
                    };
                }
                Err(e) => return Err(e),
            };

            if !transition.requires_write() {
                debug!(key = %key, day = %day, "Duplicate activity, nothing to write");
                return Ok(RecordOutcome::Recorded {
                    kind: transition.kind(),
                    day,
                    state: transition.into_state(),
                });
            }

            let expected = existing.as_ref().map(StreakState::revision);
            let saved = match self.repo.upsert(transition.state(), expected).await {
                Ok(outcome) => outcome,
                // a locked database is contention too
                Err(DomainError::Conflict(msg)) => {
                    debug!(key = %key, error = %msg, "Write contention");
                    SaveOutcome::Conflict
                }
                Err(e) => return Err(e),
            };

            match saved {
                SaveOutcome::Applied => {
                    let state = transition.state();
                    info!(
                        key = %key,
                        day = %day,
                        kind = ?transition.kind(),
                        current_streak = state.current_streak(),
                        longest_streak = state.longest_streak(),
                        total_active_days = state.total_active_days(),
                        activity_score = state.activity_score(),
                        revision = state.revision(),
                        "Activity recorded"
                    );
                    return Ok(RecordOutcome::Recorded {
                        kind: transition.kind(),
                        day,
                        state: transition.into_state(),
                    });
                }
                SaveOutcome::Conflict => {
                    retries += 1;
                    self.pause_before_retry(key, retries).await?;
                }
            }
        }
    }

    /// Sleep before retry number `retry`, or give up once retries are spent.
    async fn pause_before_retry(&self, key: &StreakKey, retry: u32) -> Result<(), DomainError> {
        let max = self.settings.max_write_retries;
        if retry > max {
            warn!(key = %key, retries = max, "Giving up after repeated contention");
            return Err(DomainError::Conflict(format!(
                "{}: gave up after {} retries",
                key, max
            )));
        }

        let backoff = self.backoff(retry);
        debug!(
            key = %key,
            retry,
            backoff_ms = backoff.as_millis() as u64,
            "Contention, retrying"
        );
        tokio::time::sleep(backoff).await;
        Ok(())
    }

    /// Linear backoff with ±25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let step = self.settings.retry_backoff.as_millis() as u64;
        let base_ms = step.saturating_mul(u64::from(attempt)).min(MAX_BACKOFF_MS);
        let jitter_range = base_ms / 4;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..=jitter_range * 2)
        } else {
            0
        };
        Duration::from_millis(base_ms.saturating_sub(jitter_range) + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use streakboard_domain::shared::{FixedClock, WorkspaceId};
    use streakboard_infrastructure::persistence::repositories::InMemoryStreakRepository;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        recorder: Arc<ActivityRecorder>,
        repo: Arc<InMemoryStreakRepository>,
        locks: Arc<KeyLocks<StreakKey>>,
        clock: Arc<FixedClock>,
    }

    fn fixture(calendar: ActivityCalendar, settings: RecorderSettings) -> Fixture {
        let repo = Arc::new(InMemoryStreakRepository::new());
        let locks = Arc::new(KeyLocks::new());
        let clock = Arc::new(FixedClock::new(at(2024, 1, 20, 12)));
        let recorder = Arc::new(ActivityRecorder::new(
            repo.clone(),
            locks.clone(),
            calendar,
            clock.clone(),
            settings,
        ));
        Fixture {
            recorder,
            repo,
            locks,
            clock,
        }
    }

    fn key(user: &str) -> StreakKey {
        StreakKey::parse("ws-1", user).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let f = fixture(ActivityCalendar::utc(), RecorderSettings::default());
        let k = key("alice");

        let first = f
            .recorder
            .record(&k, ActivitySignal::OnDay(date(2024, 1, 10)))
            .await
            .unwrap();
        assert!(matches!(first, RecordOutcome::Recorded { kind: TransitionKind::Created, .. }));
        assert!((first.state().activity_score() - 1.1).abs() < 1e-9);

        let second = f
            .recorder
            .record(&k, ActivitySignal::OnDay(date(2024, 1, 11)))
            .await
            .unwrap();
        assert_eq!(second.state().current_streak(), 2);
        assert!((second.state().activity_score() - 2.4).abs() < 1e-9);

        let third = f
            .recorder
            .record(&k, ActivitySignal::OnDay(date(2024, 1, 13)))
            .await
            .unwrap();
        assert!(matches!(
            third,
            RecordOutcome::Recorded {
                kind: TransitionKind::Restarted { missed_days: 1 },
                ..
            }
        ));
        let s = third.state();
        assert_eq!(
            (s.current_streak(), s.longest_streak(), s.total_active_days()),
            (1, 2, 3)
        );
        assert!((s.activity_score() - 3.3).abs() < 1e-9);

        let dup = f
            .recorder
            .record(&k, ActivitySignal::OnDay(date(2024, 1, 13)))
            .await
            .unwrap();
        assert!(matches!(dup, RecordOutcome::Recorded { kind: TransitionKind::Duplicate, .. }));
        assert_eq!(dup.state(), third.state());

        assert!(f.recorder.reset(&k).await.unwrap());
        let stored = f.repo.find(&k).await.unwrap().unwrap();
        assert_eq!(
            (stored.current_streak(), stored.longest_streak(), stored.total_active_days()),
            (0, 2, 3)
        );
        assert!((stored.activity_score() - 3.0).abs() < 1e-9);

        // reset is idempotent
        assert!(f.recorder.reset(&k).await.unwrap());
        assert_eq!(f.repo.find(&k).await.unwrap().unwrap().current_streak(), 0);
    }

    #[tokio::test]
    async fn test_stale_event_is_ignored() {
        let f = fixture(ActivityCalendar::utc(), RecorderSettings::default());
        let k = key("bob");

        f.recorder
            .record(&k, ActivitySignal::OnDay(date(2024, 1, 15)))
            .await
            .unwrap();
        let before = f.repo.find(&k).await.unwrap().unwrap();

        let outcome = f
            .recorder
            .record(&k, ActivitySignal::OnDay(date(2024, 1, 12)))
            .await
            .unwrap();

        assert!(matches!(outcome, RecordOutcome::StaleIgnored { .. }));
        assert_eq!(outcome.state(), &before);
        assert_eq!(f.repo.find(&k).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_future_day_is_a_validation_error() {
        let f = fixture(ActivityCalendar::utc(), RecorderSettings::default());
        let result = f
            .recorder
            .record(&key("carol"), ActivitySignal::OnDay(date(2024, 1, 21)))
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_instants_resolve_in_the_pinned_calendar() {
        // UTC+9: 20:00 UTC on the 19th is already the 20th
        let calendar = ActivityCalendar::from_offset_minutes(9 * 60).unwrap();
        let f = fixture(calendar, RecorderSettings::default());

        let outcome = f
            .recorder
            .record(&key("dan"), ActivitySignal::At(at(2024, 1, 19, 20)))
            .await
            .unwrap();
        assert_eq!(outcome.day(), date(2024, 1, 20));

        f.clock.set(at(2024, 1, 21, 1));
        let outcome = f.recorder.record(&key("dan"), ActivitySignal::Now).await.unwrap();
        assert_eq!(outcome.day(), date(2024, 1, 21));
        assert_eq!(outcome.state().current_streak(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_count_once() {
        let f = fixture(ActivityCalendar::utc(), RecorderSettings::default());
        let k = key("erin");

        let calls = (0..16).map(|_| {
            let recorder = Arc::clone(&f.recorder);
            let k = k.clone();
            async move {
                recorder
                    .record(&k, ActivitySignal::OnDay(date(2024, 1, 18)))
                    .await
            }
        });
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(Result::is_ok));

        let stored = f.repo.find(&k).await.unwrap().unwrap();
        assert_eq!(stored.total_active_days(), 1);
        assert_eq!(stored.revision(), 1);
    }

    #[tokio::test]
    async fn test_parallel_users_each_get_a_record() {
        let f = fixture(ActivityCalendar::utc(), RecorderSettings::default());

        let handles: Vec<_> = (0..20)
            .map(|i| f.recorder.record_detached(key(&format!("user-{i:02}")), ActivitySignal::Now))
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let listed = f
            .repo
            .list_workspace(&WorkspaceId::from_string("ws-1"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 20);
        assert!(listed.iter().all(|s| s.current_streak() == 1));
    }

    #[tokio::test]
    async fn test_deadline_while_key_is_held() {
        let settings = RecorderSettings {
            timeout: Duration::from_millis(30),
            ..RecorderSettings::default()
        };
        let f = fixture(ActivityCalendar::utc(), settings);
        let k = key("frank");

        let held = f.locks.acquire(&k).await;
        let result = f.recorder.record(&k, ActivitySignal::Now).await;
        assert!(matches!(result, Err(DomainError::DeadlineExceeded(_))));
        assert!(f.repo.find(&k).await.unwrap().is_none());

        drop(held);
        assert!(f.recorder.record(&k, ActivitySignal::Now).await.is_ok());
    }

    #[test]
    fn test_backoff_stays_in_jitter_band() {
        let f = fixture(ActivityCalendar::utc(), RecorderSettings::default());
        for attempt in 1..=5u32 {
            let base = 10 * u64::from(attempt);
            let ms = f.recorder.backoff(attempt).as_millis() as u64;
            assert!(ms >= base - base / 4 && ms <= base + base / 4, "attempt {attempt}: {ms}ms");
        }
        let capped = f.recorder.backoff(1_000).as_millis() as u64;
        assert!(capped <= MAX_BACKOFF_MS + MAX_BACKOFF_MS / 4);
    }
}
