use std::sync::Arc;

use chrono::Utc;
use streakboard_domain::shared::{DomainError, WorkspaceId};
use streakboard_domain::streak::{SaveOutcome, StreakEngine, StreakRepository, StreakState};
use streakboard_infrastructure::persistence::repositories::SqliteStreakRepository;

mod test_helpers;

use test_helpers::{day, key, noon};

#[tokio::test]
async fn streak_repo_insert_and_find() {
    let repo = test_helpers::in_memory_repo().await;
    let k = key("ws-1", "alice");
    let state = StreakState::first_activity(k.clone(), day(2024, 1, 10), noon(day(2024, 1, 10)));

    let outcome = repo.upsert(&state, None).await.expect("Insert streak");
    assert_eq!(outcome, SaveOutcome::Applied);

    let found = repo
        .find(&k)
        .await
        .expect("Find streak")
        .expect("Streak should exist");

    assert_eq!(found, state);
    assert!((found.activity_score() - 1.1).abs() < 1e-9);
}

#[tokio::test]
async fn streak_repo_missing_key_is_none() {
    let repo = test_helpers::in_memory_repo().await;
    let found = repo.find(&key("ws-1", "nobody")).await.expect("Find streak");
    assert!(found.is_none());
}

#[tokio::test]
async fn streak_repo_conditional_write_detects_lost_update() {
    let repo = test_helpers::in_memory_repo().await;
    let k = key("ws-1", "bob");
    let d1 = day(2024, 1, 10);
    let d2 = day(2024, 1, 11);

    let created = StreakState::first_activity(k.clone(), d1, noon(d1));
    assert_eq!(repo.upsert(&created, None).await.unwrap(), SaveOutcome::Applied);
    // A second creator racing on the same key must not clobber the row
    assert_eq!(repo.upsert(&created, None).await.unwrap(), SaveOutcome::Conflict);

    let next = StreakEngine::transition(&k, Some(&created), d2, noon(d2))
        .unwrap()
        .into_state();

    // Someone else already moved the row to revision 2
    let rival = created.reset(noon(d2));
    assert_eq!(repo.upsert(&rival, Some(1)).await.unwrap(), SaveOutcome::Applied);
    assert_eq!(repo.upsert(&next, Some(1)).await.unwrap(), SaveOutcome::Conflict);

    let stored = repo.find(&k).await.unwrap().unwrap();
    assert_eq!(stored, rival);
}

#[tokio::test]
async fn streak_repo_reset_keeps_history() {
    let repo = test_helpers::in_memory_repo().await;
    let k = key("ws-1", "carol");

    let mut state: Option<StreakState> = None;
    for d in [10, 11, 13] {
        let date = day(2024, 1, d);
        let next = StreakEngine::transition(&k, state.as_ref(), date, noon(date))
            .unwrap()
            .into_state();
        let expected = state.as_ref().map(StreakState::revision);
        assert_eq!(repo.upsert(&next, expected).await.unwrap(), SaveOutcome::Applied);
        state = Some(next);
    }

    assert!(repo.reset(&k, Utc::now()).await.expect("Reset streak"));

    let stored = repo.find(&k).await.unwrap().unwrap();
    assert_eq!(stored.current_streak(), 0);
    assert_eq!(stored.longest_streak(), 2);
    assert_eq!(stored.total_active_days(), 3);
    assert!((stored.activity_score() - 3.0).abs() < 1e-9);
    assert_eq!(stored.last_active_date(), day(2024, 1, 13));
    assert_eq!(stored.revision(), 4);
}

#[tokio::test]
async fn streak_repo_reset_missing_key_is_noop() {
    let repo = test_helpers::in_memory_repo().await;
    let reset = repo.reset(&key("ws-1", "ghost"), Utc::now()).await.unwrap();
    assert!(!reset);
    assert!(repo.find(&key("ws-1", "ghost")).await.unwrap().is_none());
}

#[tokio::test]
async fn streak_repo_leaderboard_is_deterministic() {
    let repo = test_helpers::in_memory_repo().await;
    let now = Utc::now();
    let last = day(2024, 1, 10);

    // A: 5 days, no run -> 5.0; B and C: 6 days with a run of 2 -> 7.2
    let rows = [
        ("ws-1", "A", 0, 1, 5),
        ("ws-1", "C", 2, 2, 6),
        ("ws-1", "B", 2, 3, 6),
        ("ws-2", "Z", 9, 9, 9),
    ];
    for (ws, user, current, longest, total) in rows {
        let state = StreakState::restore(
            key(ws, user),
            current,
            longest,
            total,
            streakboard_domain::streak::activity_score(total, current),
            last,
            now,
            1,
        );
        repo.upsert(&state, None).await.unwrap();
    }

    let board = repo
        .leaderboard(&WorkspaceId::from_string("ws-1"), 10)
        .await
        .expect("Load leaderboard");

    let users: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(users, vec!["B", "C", "A"]);
    assert!((board[0].activity_score - 7.2).abs() < 1e-9);
    assert!((board[2].activity_score - 5.0).abs() < 1e-9);

    let top = repo
        .leaderboard(&WorkspaceId::from_string("ws-1"), 1)
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].user_id.as_str(), "B");
}

#[tokio::test]
async fn streak_repo_leaderboard_ties_equal_scores_from_different_counters() {
    let repo = test_helpers::in_memory_repo().await;
    let now = Utc::now();
    let last = day(2024, 1, 10);

    // 7 * 1.2 == 6 * 1.4 == 8.4 and 5 * 1.6 == 8.0; the longer run ranks first
    let rows = [("x", 2, 2, 7), ("y", 4, 4, 6), ("p", 6, 6, 5), ("q", 3, 3, 8)];
    for (user, current, longest, total) in rows {
        let state = StreakState::restore(
            key("ws-1", user),
            current,
            longest,
            total,
            streakboard_domain::streak::activity_score(total, current),
            last,
            now,
            1,
        );
        repo.upsert(&state, None).await.unwrap();
    }

    // q drops to 8 * 1.0 in SQL, tying with p
    assert!(repo.reset(&key("ws-1", "q"), now).await.unwrap());

    let board = repo
        .leaderboard(&WorkspaceId::from_string("ws-1"), 10)
        .await
        .expect("Load leaderboard");

    let users: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(users, vec!["y", "x", "p", "q"]);
    assert_eq!(board[0].activity_score, board[1].activity_score);
    assert_eq!(board[2].activity_score, board[3].activity_score);
}

#[tokio::test]
async fn streak_repo_list_and_delete() {
    let repo = test_helpers::in_memory_repo().await;
    let d = day(2024, 2, 1);

    for user in ["zed", "amy", "kim"] {
        let state = StreakState::first_activity(key("ws-1", user), d, noon(d));
        repo.upsert(&state, None).await.unwrap();
    }
    let outsider = StreakState::first_activity(key("ws-2", "amy"), d, noon(d));
    repo.upsert(&outsider, None).await.unwrap();

    let ws1 = WorkspaceId::from_string("ws-1");
    let listed = repo.list_workspace(&ws1).await.expect("List workspace");
    let users: Vec<&str> = listed.iter().map(|s| s.user_id().as_str()).collect();
    assert_eq!(users, vec!["amy", "kim", "zed"]);

    assert!(repo.delete(&key("ws-1", "kim")).await.unwrap());
    assert!(!repo.delete(&key("ws-1", "kim")).await.unwrap());

    assert_eq!(repo.delete_workspace(&ws1).await.unwrap(), 2);
    assert!(repo.list_workspace(&ws1).await.unwrap().is_empty());
    assert!(repo.find(outsider.key()).await.unwrap().is_some());
}

#[tokio::test]
async fn streak_repo_rejects_corrupted_rows() {
    let pool = test_helpers::setup_in_memory_db().await;
    let repo = SqliteStreakRepository::new(Arc::new(pool.clone()));

    sqlx::query(
        r#"
        INSERT INTO streaks (workspace_id, user_id, current_streak, longest_streak,
            total_active_days, activity_score, last_active_date, updated_at, revision)
        VALUES ('ws-1', 'mallory', 2, 2, 2, 99.0, '2024-01-10', '2024-01-10T12:00:00Z', 1)
        "#,
    )
    .execute(&pool)
    .await
    .expect("Seed corrupted row");

    let result = repo.find(&key("ws-1", "mallory")).await;
    assert!(matches!(result, Err(DomainError::DataIntegrity(_))));
}

#[tokio::test]
async fn streak_repo_schema_enforces_counter_invariants() {
    let pool = test_helpers::setup_in_memory_db().await;

    let result = sqlx::query(
        r#"
        INSERT INTO streaks (workspace_id, user_id, current_streak, longest_streak,
            total_active_days, activity_score, last_active_date, updated_at, revision)
        VALUES ('ws-1', 'eve', 5, 2, 5, 7.5, '2024-01-10', '2024-01-10T12:00:00Z', 1)
        "#,
    )
    .execute(&pool)
    .await;

    assert!(result.is_err());
}
