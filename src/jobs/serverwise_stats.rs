use crate::{
    constants::{TOTAL_PLAYS_KEY, TOTAL_PP_KEY, TOTAL_SUBMITTED_SCORES_KEY},
    database::sources::RankingSource,
    error::JobError,
    ranking_index::RankingIndex
};
use tracing::info;

/// Copies the server-wide totals into the ranking index as plain values
pub async fn run(source: &dyn RankingSource, index: &dyn RankingIndex) -> Result<(), JobError> {
    let totals = source.server_totals().await?;

    for (key, value) in [
        (TOTAL_SUBMITTED_SCORES_KEY, totals.submitted_scores),
        (TOTAL_PLAYS_KEY, totals.plays),
        (TOTAL_PP_KEY, totals.pp)
    ] {
        index.set_value(key, value).await?;
    }

    info!(?totals, "Server-wide stats published");
    Ok(())
}
