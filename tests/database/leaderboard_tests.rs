use rank_processor::{
    database::{db::LeaderboardDb, sources::LeaderboardStore},
    jobs::leaderboard::{publish_mode, rank_entries},
    model::structures::mode::Mode
};
use serial_test::serial;

use super::test_helpers::TestDatabase;
use crate::common::init_test_env;

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_replace_leaderboard_swaps_rows() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let store = LeaderboardDb::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    let first = rank_entries(Mode::Taiko, vec![(1, 10), (2, 20)]);
    store.replace_leaderboard(Mode::Taiko, &first).await.unwrap();
    assert_eq!(store.leaderboard(Mode::Taiko).await.unwrap(), first);

    let second = rank_entries(Mode::Taiko, vec![(3, 5)]);
    store.replace_leaderboard(Mode::Taiko, &second).await.unwrap();
    assert_eq!(store.leaderboard(Mode::Taiko).await.unwrap(), second);

    // Other modes are untouched
    assert!(store.leaderboard(Mode::Std).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_concurrent_reader_never_sees_partial_table() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let store = LeaderboardDb::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    let small = rank_entries(Mode::Std, (1..=3).map(|id| (id, id as i64)).collect());
    let large = rank_entries(Mode::Std, (1..=5000).map(|id| (id, id as i64)).collect());
    store.replace_leaderboard(Mode::Std, &small).await.unwrap();

    let reader_client = test_db.get_client().await.unwrap();
    let reader = tokio::spawn(async move {
        let mut counts = Vec::new();
        for _ in 0..100 {
            let count: i64 = reader_client
                .query_one("SELECT COUNT(*) FROM leaderboard_std", &[])
                .await
                .unwrap()
                .get(0);
            counts.push(count);
        }
        counts
    });

    for i in 0..10 {
        let entries = if i % 2 == 0 { &large } else { &small };
        store.replace_leaderboard(Mode::Std, entries).await.unwrap();
    }

    let counts = reader.await.unwrap();
    assert!(
        counts.iter().all(|n| *n == 3 || *n == 5000),
        "observed a partial table: {:?}",
        counts
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_mode_without_users_keeps_previous_table() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let client = test_db.get_client().await.unwrap();
    client
        .execute("INSERT INTO leaderboard_mania (position, user_id, v) VALUES (1, 99, 1000)", &[])
        .await
        .unwrap();

    let store = LeaderboardDb::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");

    assert_eq!(publish_mode(&store, Mode::Mania).await.unwrap(), 0);
    assert_eq!(
        store.leaderboard(Mode::Mania).await.unwrap(),
        rank_entries(Mode::Mania, vec![(99, 1000)])
    );
}
