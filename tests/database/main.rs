//! Postgres-backed tests. Each test starts its own container, so docker must be
//! available: `cargo test --test database -- --ignored`

#[path = "../common/mod.rs"]
mod common;

mod db_tests;
mod leaderboard_tests;
mod test_helpers;
