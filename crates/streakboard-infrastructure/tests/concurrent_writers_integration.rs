use std::sync::Arc;

use streakboard_domain::streak::{SaveOutcome, StreakEngine, StreakRepository, StreakState};
use streakboard_infrastructure::concurrency::KeyLocks;
use streakboard_infrastructure::persistence::repositories::SqliteStreakRepository;

mod test_helpers;

use test_helpers::{day, key, noon};

/// Two repositories over the same file stand in for two processes: they share
/// no in-process lock, only the database.
#[tokio::test]
async fn separate_pools_cannot_both_create_the_same_streak() {
    let dir = tempfile::tempdir().expect("Create temp dir");
    let pool_a = test_helpers::setup_file_db(dir.path()).await;
    let pool_b = test_helpers::setup_file_db(dir.path()).await;

    let repo_a = SqliteStreakRepository::new(Arc::new(pool_a));
    let repo_b = SqliteStreakRepository::new(Arc::new(pool_b));

    let d = day(2024, 1, 10);
    let state = StreakState::first_activity(key("ws-1", "alice"), d, noon(d));

    let (a, b) = tokio::join!(repo_a.upsert(&state, None), repo_b.upsert(&state, None));
    let outcomes = [a.expect("writer a"), b.expect("writer b")];

    let applied = outcomes
        .iter()
        .filter(|o| **o == SaveOutcome::Applied)
        .count();
    assert_eq!(applied, 1, "exactly one creator wins: {outcomes:?}");
}

/// Read-compute-write under the per-key lock loses no increments.
#[tokio::test]
async fn keyed_lock_serializes_read_compute_write() {
    let dir = tempfile::tempdir().expect("Create temp dir");
    let pool = test_helpers::setup_file_db(dir.path()).await;
    let repo = Arc::new(SqliteStreakRepository::new(Arc::new(pool)));
    let locks = Arc::new(KeyLocks::new());
    let k = key("ws-1", "bob");

    // Ten consecutive days, all recorded concurrently
    let handles: Vec<_> = (1..=10u32)
        .map(|d| {
            let repo = Arc::clone(&repo);
            let locks = Arc::clone(&locks);
            let k = k.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&k).await;
                let existing = repo.find(&k).await.expect("find");
                let date = day(2024, 3, d);
                match StreakEngine::transition(&k, existing.as_ref(), date, noon(date)) {
                    Ok(transition) if transition.requires_write() => {
                        let expected = existing.as_ref().map(StreakState::revision);
                        let outcome = repo
                            .upsert(transition.state(), expected)
                            .await
                            .expect("upsert");
                        assert_eq!(outcome, SaveOutcome::Applied);
                    }
                    // days earlier than the stored one arrive late and are dropped
                    _ => {}
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task panicked");
    }

    let stored = repo.find(&k).await.unwrap().expect("streak exists");
    stored.check_invariants().expect("invariants hold");
    assert!(stored.total_active_days() >= 1);
    assert_eq!(stored.revision(), u64::from(stored.total_active_days()));
}
