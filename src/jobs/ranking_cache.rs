use crate::{
    constants::{
        COUNTRY_LIST_KEY, INACTIVITY_DAYS_PER_LN_PLAYCOUNT, INDEX_BATCH_SIZE, LEADERBOARD_NAMESPACE, SECONDS_PER_DAY,
        UNKNOWN_COUNTRY
    },
    database::{db_structs::RankingRow, sources::RankingSource},
    error::JobError,
    model::structures::{mode::Mode, variant::Variant},
    ranking_index::{ranking_key, IndexOp, RankingIndex},
    utils::progress_utils::progress_spinner
};
use futures::StreamExt;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Whether a user has been away long enough to drop off the rankings.
///
/// The tolerated absence grows with `ln(playcount)`; users without plays are
/// always inactive.
pub fn is_inactive(seconds_inactive: f64, playcount: i32) -> bool {
    if playcount <= 0 {
        return true;
    }

    let days_inactive = seconds_inactive / SECONDS_PER_DAY;
    days_inactive > (playcount as f64).ln() * INACTIVITY_DAYS_PER_LN_PLAYCOUNT
}

/// Lowercased country code, or `None` when unknown
pub fn normalize_country(country: Option<&str>) -> Option<String> {
    let country = country?.trim().to_lowercase();
    if country.is_empty() || country == UNKNOWN_COUNTRY {
        return None;
    }

    Some(country)
}

/// Index writes for one user of one variant.
///
/// Every active mode gets a global entry and, with a known country, a
/// per-country entry. A classic row with at least one active mode also counts
/// once towards its country's popularity.
pub fn row_ops(row: &RankingRow, variant: Variant, now: i64) -> Vec<IndexOp> {
    let country = normalize_country(row.country.as_deref());
    let seconds_inactive = (now - row.latest_activity) as f64;
    let member = row.user_id.to_string();

    let mut ops = Vec::new();
    let mut visible = false;
    for mode in Mode::iter() {
        let standing = row.standing(mode);
        if is_inactive(seconds_inactive, standing.playcount) {
            continue;
        }
        visible = true;

        ops.push(IndexOp::AddMember {
            key: ranking_key(mode, variant, None),
            member: member.clone(),
            score: standing.score as f64
        });
        if let Some(country) = country.as_deref() {
            ops.push(IndexOp::AddMember {
                key: ranking_key(mode, variant, Some(country)),
                member: member.clone(),
                score: standing.score as f64
            });
        }
    }

    if let (true, Variant::Classic, Some(country)) = (visible, variant, country) {
        ops.push(IndexOp::IncrementMember {
            key: COUNTRY_LIST_KEY.to_string(),
            member: country,
            by: 1.0
        });
    }

    ops
}

#[instrument(skip(source, index, now))]
async fn publish_variant(
    source: &dyn RankingSource,
    index: &dyn RankingIndex,
    variant: Variant,
    now: i64
) -> Result<u64, JobError> {
    let span = Span::current();
    progress_spinner(&span, "Publishing rankings");

    let mut rows = source.ranking_rows(variant).await?;
    let mut batch: Vec<IndexOp> = Vec::with_capacity(INDEX_BATCH_SIZE);
    let mut users = 0u64;

    while let Some(row) = rows.next().await {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable ranking row");
                continue;
            }
        };

        batch.extend(row_ops(&row, variant, now));
        users += 1;
        span.pb_inc(1);

        if batch.len() >= INDEX_BATCH_SIZE {
            index.apply(&batch).await?;
            batch.clear();
        }
    }

    index.apply(&batch).await?;
    Ok(users)
}

/// Clears every published ranking and republishes both variants from the
/// cached scores. `now` is in unix seconds.
pub async fn run(source: &dyn RankingSource, index: &dyn RankingIndex, now: i64) -> Result<(), JobError> {
    let deleted = index.clear_namespace(LEADERBOARD_NAMESPACE, &[COUNTRY_LIST_KEY]).await?;
    debug!(deleted, "Cleared previous rankings");

    for variant in Variant::iter() {
        let users = publish_variant(source, index, variant, now).await?;
        info!(?variant, users, "Rankings published");
    }

    Ok(())
}
