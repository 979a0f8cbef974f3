use crate::{
    database::{db_structs::LeaderboardEntry, sources::LeaderboardStore},
    error::JobError,
    model::structures::mode::Mode,
    utils::progress_utils::progress_bar
};
use strum::IntoEnumIterator;
use tracing::{info, instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Orders users by value (highest first, ties by lowest user id) and assigns
/// positions starting at 1
pub fn rank_entries(mode: Mode, mut values: Vec<(i32, i64)>) -> Vec<LeaderboardEntry> {
    values.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    values
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, value))| LeaderboardEntry {
            mode,
            position: i as i32 + 1,
            user_id,
            value
        })
        .collect()
}

/// Rebuilds the leaderboard of one mode. Returns the number of ranked users;
/// a mode nobody is ranked in keeps its previous table.
pub async fn publish_mode(store: &dyn LeaderboardStore, mode: Mode) -> Result<usize, JobError> {
    let values = store.ranked_values(mode).await?;
    if values.is_empty() {
        info!(%mode, "No ranked users, leaving leaderboard untouched");
        return Ok(0);
    }

    let entries = rank_entries(mode, values);
    store.replace_leaderboard(mode, &entries).await?;
    info!(%mode, users = entries.len(), "Leaderboard replaced");

    Ok(entries.len())
}

#[instrument(name = "build_leaderboards", skip_all)]
pub async fn run(store: &dyn LeaderboardStore) -> Result<(), JobError> {
    let span = Span::current();
    progress_bar(&span, Mode::iter().len() as u64, "Building leaderboards");

    for mode in Mode::iter() {
        publish_mode(store, mode).await?;
        span.pb_inc(1);
    }

    Ok(())
}
