use chrono::Utc;
use futures::TryStreamExt;
use rank_processor::{
    constants::{COUNTRY_LIST_KEY, TOTAL_PLAYS_KEY, TOTAL_SUBMITTED_SCORES_KEY},
    database::{
        db::{DbClient, LeaderboardDb},
        db_structs::RawEvent,
        sources::{EventSource, LeaderboardStore, RankingSource},
        sql_param::SqlParam
    },
    dispatch::{DispatcherConfig, WriteDispatcher, WriteRequest},
    jobs::{cache_data, maintenance, run_cycle, Job, JobConfig, JobOutcome, Services},
    model::structures::{mode::Mode, variant::Variant},
    utils::test_utils::MemoryRankingIndex
};
use serial_test::serial;
use std::sync::Arc;

use super::test_helpers::TestDatabase;
use crate::common::init_test_env;

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_events_read_completed_scores() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let db = DbClient::connect(&test_db.connection_string).await.expect("Failed to connect");
    let events: Vec<RawEvent> = db.events().await.unwrap().try_collect().await.unwrap();

    // The completed = 2 play is not a personal best
    assert_eq!(events.len(), 10);
    assert!(events.iter().all(|e| e.pp != Some(900.0)));

    let loved = events.iter().find(|e| e.pp == Some(500.0)).unwrap();
    assert!(!loved.counts_for_pp);

    let relax: Vec<&RawEvent> = events.iter().filter(|e| e.variant == Variant::Relax).collect();
    assert_eq!(relax.len(), 2);
    assert!(relax.iter().all(|e| e.mode == Mode::Taiko && e.user_id == 2));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_cache_update_keeps_null_columns() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let db = Arc::new(DbClient::connect(&test_db.connection_string).await.expect("Failed to connect"));
    let dispatcher = WriteDispatcher::start(db.clone(), DispatcherConfig::default());

    dispatcher
        .submit(WriteRequest::unordered(
            rank_processor::database::statements::cache_update(Mode::Ctb, Variant::Classic),
            vec![SqlParam::BigInt(Some(77)), SqlParam::Double(None), SqlParam::Int(1)]
        ))
        .await
        .unwrap();
    let summary = dispatcher.close().await;
    assert_eq!(summary.failed, 0);

    let row = db
        .client()
        .query_one("SELECT pp_ctb, avg_accuracy_ctb FROM users_stats WHERE id = 1", &[])
        .await
        .unwrap();
    assert_eq!(row.get::<_, i64>(0), 77);
    assert_eq!(row.get::<_, f64>(1), 0.0);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_full_cycle_against_postgres() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let db = Arc::new(DbClient::connect(&test_db.connection_string).await.expect("Failed to connect"));
    let leaderboards = LeaderboardDb::connect(&test_db.connection_string)
        .await
        .expect("Failed to connect");
    let index = Arc::new(MemoryRankingIndex::default());

    let services = Services {
        events: db.clone(),
        plays: db.clone(),
        rankings: db.clone(),
        leaderboards: Some(Arc::new(leaderboards)),
        index: Some(index.clone())
    };
    let dispatcher = Arc::new(WriteDispatcher::start(db.clone(), DispatcherConfig::default()));

    let config = JobConfig {
        maintenance: false,
        ..JobConfig::all()
    };
    let summary = run_cycle(services, config, dispatcher).await;
    assert_eq!(summary.count(JobOutcome::Failed), 0);
    assert_eq!(summary.outcome(Job::Maintenance), None);

    // 100 + 90 + 81 + 1 + 1; the loved play does not count
    let pp: Vec<(i32, i64)> = db
        .client()
        .query("SELECT id, pp_std FROM users_stats ORDER BY id", &[])
        .await
        .unwrap()
        .iter()
        .map(|r| (r.get(0), r.get(1)))
        .collect();
    assert_eq!(pp, vec![(1, 273), (2, 50), (3, 0), (4, 800)]);

    let relax_taiko: i64 = db
        .client()
        .query_one("SELECT pp_taiko FROM users_stats_relax WHERE id = 2", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(relax_taiko, 30);

    let accuracy: f64 = db
        .client()
        .query_one("SELECT avg_accuracy_std FROM users_stats WHERE id = 2", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(accuracy, 95.0);

    // The restricted user is not ranked
    let table: Vec<(i32, i32, i64)> = LeaderboardDb::connect(&test_db.connection_string)
        .await
        .unwrap()
        .leaderboard(Mode::Std)
        .await
        .unwrap()
        .iter()
        .map(|e| (e.position, e.user_id, e.value))
        .collect();
    assert_eq!(table, vec![(1, 1, 273), (2, 2, 50), (3, 3, 0)]);

    // carol has been away too long for two plays
    assert_eq!(
        index.members("ripple:leaderboard:std"),
        vec![("1".to_string(), 273.0), ("2".to_string(), 50.0)]
    );
    assert_eq!(index.members("ripple:leaderboard:std:de"), vec![("1".to_string(), 273.0)]);
    assert_eq!(index.members("ripple:leaderboard:taiko:jp:relax"), vec![("2".to_string(), 30.0)]);
    assert_eq!(index.score(COUNTRY_LIST_KEY, "jp"), Some(1.0));
    assert_eq!(index.score(COUNTRY_LIST_KEY, "fr"), None);

    assert_eq!(index.value(TOTAL_SUBMITTED_SCORES_KEY), Some(11));
    assert_eq!(index.value(TOTAL_PLAYS_KEY), Some(21));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_cache_data_against_postgres() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let client = test_db.get_client().await.unwrap();
    client
        .batch_execute(
            "
        UPDATE scores SET score = 1000, count_300 = 10, count_100 = 2, count_50 = 1, playtime = 60 WHERE userid = 2;
        UPDATE scores SET score = 5000, count_300 = 4 WHERE userid = 1 AND completed = 2;
        "
        )
        .await
        .unwrap();

    let db = Arc::new(DbClient::connect(&test_db.connection_string).await.expect("Failed to connect"));
    let dispatcher = WriteDispatcher::start(db.clone(), DispatcherConfig::default());

    cache_data::run(db.as_ref(), &dispatcher).await.unwrap();
    let summary = dispatcher.close().await;
    assert_eq!(summary.failed, 0);

    let totals: Vec<(i32, i64, i64, i64, i64, i64)> = client
        .query(
            "SELECT id, ranked_score_std, total_hits_std, playtime_std, ranked_score_taiko, total_hits_taiko
             FROM users_stats WHERE id IN (1, 2) ORDER BY id",
            &[]
        )
        .await
        .unwrap()
        .iter()
        .map(|r| (r.get(0), r.get(1), r.get(2), r.get(3), r.get(4), r.get(5)))
        .collect();

    // The completed = 2 play adds hits but no ranked score; relax plays fold
    // into the same totals
    assert_eq!(totals, vec![(1, 0, 4, 0, 0, 0), (2, 1000, 13, 60, 2000, 26)]);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_server_totals() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let db = DbClient::connect(&test_db.connection_string).await.expect("Failed to connect");
    let totals = db.server_totals().await.unwrap();

    assert_eq!(totals.submitted_scores, 11);
    assert_eq!(totals.plays, 21);
    assert_eq!(totals.pp, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_maintenance_deletes_expired_rows() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db.seed_test_data().await.expect("Failed to seed test data");

    let db = Arc::new(DbClient::connect(&test_db.connection_string).await.expect("Failed to connect"));
    let dispatcher = WriteDispatcher::start(db.clone(), DispatcherConfig::default());

    maintenance::run(&dispatcher, Utc::now()).await.unwrap();
    let summary = dispatcher.close().await;
    assert_eq!(summary.applied, 2);

    let client = test_db.get_client().await.unwrap();
    let resets: i64 = client
        .query_one("SELECT COUNT(*) FROM password_recovery", &[])
        .await
        .unwrap()
        .get(0);
    let tokens: i64 = client.query_one("SELECT COUNT(*) FROM tokens", &[]).await.unwrap().get(0);

    assert_eq!(resets, 1);
    // Only the stale private token goes
    assert_eq!(tokens, 2);
}
