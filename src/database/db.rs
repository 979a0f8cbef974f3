use super::{
    db_structs::{LeaderboardEntry, ModeStanding, PlayRecord, RankingRow, RawEvent, ServerTotals},
    sources::{EventSource, LeaderboardStore, PlaySource, RankingSource, RowStream},
    statements
};
use crate::{
    dispatch::{WriteExecutor, WriteRequest},
    error::DbError,
    model::structures::{mode::Mode, variant::Variant}
};
use async_trait::async_trait;
use futures::StreamExt;
use postgres_types::ToSql;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

const PP_COLUMNS: [&str; 4] = ["pp_std", "pp_taiko", "pp_ctb", "pp_mania"];
const PLAYCOUNT_COLUMNS: [&str; 4] = ["playcount_std", "playcount_taiko", "playcount_ctb", "playcount_mania"];

/// Opens a connection and drives it on a background task
async fn open(connection_str: &str) -> Result<Client, DbError> {
    let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("connection error: {}", e);
        }
    });

    Ok(client)
}

/// Shared connection used for reads and for every dispatched write.
///
/// `tokio_postgres` pipelines concurrent queries over one connection, so the
/// dispatcher's workers all run through the same client.
#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, DbError> {
        let client = open(connection_str).await?;
        info!("Connected to the relational store");

        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    fn event_from_row(row: &Row) -> Result<RawEvent, DbError> {
        let play_mode = row.try_get::<_, i32>("play_mode")?;
        let is_relax = row.try_get::<_, i32>("is_relax")?;

        Ok(RawEvent {
            user_id: row.try_get("user_id")?,
            mode: Mode::try_from(play_mode).map_err(|_| DbError::UnknownMode(play_mode))?,
            variant: Variant::try_from(is_relax).map_err(|_| DbError::UnknownVariant(is_relax))?,
            pp: row.try_get("pp")?,
            accuracy: row.try_get("accuracy")?,
            counts_for_pp: row.try_get("counts_for_pp")?
        })
    }

    fn play_from_row(row: &Row) -> Result<PlayRecord, DbError> {
        let play_mode = row.try_get::<_, i32>("play_mode")?;

        Ok(PlayRecord {
            user_id: row.try_get("user_id")?,
            mode: Mode::try_from(play_mode).map_err(|_| DbError::UnknownMode(play_mode))?,
            score: row.try_get("score")?,
            completed: row.try_get("completed")?,
            hits: row.try_get("hits")?,
            playtime: row.try_get("playtime")?
        })
    }

    fn ranking_row_from_row(row: &Row) -> Result<RankingRow, DbError> {
        let mut standings = [ModeStanding::default(); 4];
        for mode in Mode::iter() {
            standings[mode.index()] = ModeStanding {
                score: row.try_get(PP_COLUMNS[mode.index()])?,
                playcount: row.try_get(PLAYCOUNT_COLUMNS[mode.index()])?
            };
        }

        Ok(RankingRow {
            user_id: row.try_get("user_id")?,
            country: row.try_get("country")?,
            standings,
            latest_activity: row.try_get("latest_activity")?
        })
    }

    async fn query_stream<T, F>(&self, query: &'static str, scan: F) -> Result<RowStream<T>, DbError>
    where
        T: Send + 'static,
        F: Fn(&Row) -> Result<T, DbError> + Send + 'static
    {
        let params: [&(dyn ToSql + Sync); 0] = [];
        let rows = self.client.query_raw(query, params).await?;

        Ok(rows.map(move |row| row.map_err(DbError::from).and_then(|row| scan(&row))).boxed())
    }

    async fn scalar(&self, query: &str) -> Result<i64, DbError> {
        let row = self.client.query_one(query, &[]).await?;
        Ok(row.try_get(0)?)
    }

    // Access the underlying Client
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }
}

#[async_trait]
impl EventSource for DbClient {
    async fn events(&self) -> Result<RowStream<RawEvent>, DbError> {
        info!("Fetching completed scores...");
        self.query_stream(statements::RAW_EVENTS, Self::event_from_row).await
    }
}

#[async_trait]
impl PlaySource for DbClient {
    async fn plays(&self) -> Result<RowStream<PlayRecord>, DbError> {
        info!("Fetching every submitted score...");
        self.query_stream(statements::PLAY_RECORDS, Self::play_from_row).await
    }
}

#[async_trait]
impl RankingSource for DbClient {
    async fn ranking_rows(&self, variant: Variant) -> Result<RowStream<RankingRow>, DbError> {
        debug!(?variant, "Fetching ranking rows");
        self.query_stream(statements::ranking_source(variant), Self::ranking_row_from_row)
            .await
    }

    async fn server_totals(&self) -> Result<ServerTotals, DbError> {
        Ok(ServerTotals {
            submitted_scores: self.scalar(statements::TOTAL_SUBMITTED_SCORES).await?,
            plays: self.scalar(statements::TOTAL_PLAYS).await?,
            pp: self.scalar(statements::TOTAL_PP).await?
        })
    }
}

#[async_trait]
impl WriteExecutor for DbClient {
    async fn execute(&self, request: &WriteRequest) -> Result<u64, DbError> {
        let params: Vec<&(dyn ToSql + Sync)> = request.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        Ok(self.client.execute(request.query, &params).await?)
    }
}

/// Dedicated connection for leaderboard rebuilds.
///
/// A rebuild runs inside one transaction, which needs exclusive use of its
/// connection; sharing [`DbClient`]'s would pull concurrent dispatcher writes
/// into that transaction.
pub struct LeaderboardDb {
    client: Mutex<Client>
}

impl LeaderboardDb {
    pub async fn connect(connection_str: &str) -> Result<Self, DbError> {
        Ok(LeaderboardDb {
            client: Mutex::new(open(connection_str).await?)
        })
    }
}

#[async_trait]
impl LeaderboardStore for LeaderboardDb {
    async fn ranked_values(&self, mode: Mode) -> Result<Vec<(i32, i64)>, DbError> {
        let client = self.client.lock().await;
        let rows = client.query(statements::leaderboard_source(mode), &[]).await?;

        rows.iter()
            .map(|row| -> Result<(i32, i64), DbError> { Ok((row.try_get("user_id")?, row.try_get("value")?)) })
            .collect()
    }

    async fn replace_leaderboard(&self, mode: Mode, entries: &[LeaderboardEntry]) -> Result<(), DbError> {
        let positions: Vec<i32> = entries.iter().map(|e| e.position).collect();
        let user_ids: Vec<i32> = entries.iter().map(|e| e.user_id).collect();
        let values: Vec<i64> = entries.iter().map(|e| e.value).collect();

        let mut client = self.client.lock().await;

        // Dropping the transaction before commit rolls it back and leaves the
        // previous leaderboard in place
        let transaction = client.transaction().await?;
        transaction.batch_execute(statements::leaderboard_lock(mode)).await?;
        transaction.execute(statements::leaderboard_clear(mode), &[]).await?;
        transaction
            .execute(statements::leaderboard_insert(mode), &[&positions, &user_ids, &values])
            .await?;
        transaction.commit().await?;

        Ok(())
    }

    async fn leaderboard(&self, mode: Mode) -> Result<Vec<LeaderboardEntry>, DbError> {
        let client = self.client.lock().await;
        let rows = client.query(statements::leaderboard_snapshot(mode), &[]).await?;

        rows.iter()
            .map(|row| -> Result<LeaderboardEntry, DbError> {
                Ok(LeaderboardEntry {
                    mode,
                    position: row.try_get("position")?,
                    user_id: row.try_get("user_id")?,
                    value: row.try_get("v")?
                })
            })
            .collect()
    }
}
