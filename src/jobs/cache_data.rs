use crate::{
    constants::PROGRESS_INTERVAL,
    database::{db_structs::PlayTotals, sources::PlaySource, sql_param::SqlParam, statements},
    dispatch::{WriteDispatcher, WriteRequest},
    error::JobError,
    model::structures::mode::Mode,
    utils::progress_utils::progress_spinner
};
use futures::StreamExt;
use indexmap::IndexMap;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::aggregation::PassStats;

/// Totals of one user, indexed by [`Mode::index`]
pub type UserTotals = [PlayTotals; 4];

/// Streams every submitted play once and sums it into its user's mode.
/// Rows that fail to scan are logged and skipped.
#[instrument(skip(source))]
pub async fn collect_totals(source: &dyn PlaySource) -> Result<(IndexMap<i32, UserTotals>, PassStats), JobError> {
    let span = Span::current();
    progress_spinner(&span, "Summing plays");

    let mut users: IndexMap<i32, UserTotals> = IndexMap::new();
    let mut stats = PassStats::default();
    let mut plays = source.plays().await?;

    while let Some(row) = plays.next().await {
        let play = match row {
            Ok(play) => play,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable play");
                stats.skipped += 1;
                continue;
            }
        };

        users.entry(play.user_id).or_default()[play.mode.index()].add(&play);

        stats.events += 1;
        span.pb_inc(1);
        if stats.events % PROGRESS_INTERVAL == 0 {
            debug!(plays = stats.events, users = users.len(), "Play totals progress");
        }
    }

    Ok((users, stats))
}

pub fn totals_update_request(user_id: i32, mode: Mode, totals: PlayTotals) -> WriteRequest {
    WriteRequest::unordered(
        statements::play_totals_update(mode),
        vec![
            SqlParam::BigInt(Some(totals.ranked_score)),
            SqlParam::BigInt(Some(totals.total_hits)),
            SqlParam::BigInt(Some(totals.playtime)),
            SqlParam::Int(user_id),
        ]
    )
}

/// Rewrites the ranked score, total hits and playtime of every mode for each
/// user with at least one play, then waits for the writes to land.
pub async fn run(source: &dyn PlaySource, dispatcher: &WriteDispatcher) -> Result<(), JobError> {
    let (users, stats) = collect_totals(source).await?;
    info!(
        plays = stats.events,
        skipped = stats.skipped,
        users = users.len(),
        "Fetched every play, caching totals"
    );

    let mut submitted = 0u64;
    for (user_id, totals) in users {
        for mode in Mode::iter() {
            dispatcher
                .submit(totals_update_request(user_id, mode, totals[mode.index()]))
                .await?;
            submitted += 1;
        }
    }

    dispatcher.flush().await;
    info!(updates = submitted, "Play totals cached");

    Ok(())
}
