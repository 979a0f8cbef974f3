//! Read/write seams between the jobs and the stores behind them.
//!
//! [`DbClient`](super::db::DbClient) implements these against postgres; the
//! in-memory versions in [`test_utils`](crate::utils::test_utils) back the tests.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    database::db_structs::{LeaderboardEntry, PlayRecord, RankingRow, RawEvent, ServerTotals},
    error::DbError,
    model::structures::{mode::Mode, variant::Variant}
};

/// Row stream where every item is scanned independently, so a bad row
/// surfaces as an `Err` item instead of ending the stream.
pub type RowStream<T> = BoxStream<'static, Result<T, DbError>>;

#[async_trait]
pub trait EventSource: Send + Sync {
    /// Every completed play, in no particular order
    async fn events(&self) -> Result<RowStream<RawEvent>, DbError>;
}

#[async_trait]
pub trait PlaySource: Send + Sync {
    /// Every submitted play, completed or not
    async fn plays(&self) -> Result<RowStream<PlayRecord>, DbError>;
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Cached `(user_id, value)` of every ranked user for the mode
    async fn ranked_values(&self, mode: Mode) -> Result<Vec<(i32, i64)>, DbError>;

    /// Replaces the full leaderboard of the mode. Readers observe either the
    /// previous table or the new one, never anything in between.
    async fn replace_leaderboard(&self, mode: Mode, entries: &[LeaderboardEntry]) -> Result<(), DbError>;

    /// Current leaderboard of the mode, ordered by position
    async fn leaderboard(&self, mode: Mode) -> Result<Vec<LeaderboardEntry>, DbError>;
}

#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn ranking_rows(&self, variant: Variant) -> Result<RowStream<RankingRow>, DbError>;

    async fn server_totals(&self) -> Result<ServerTotals, DbError>;
}
