use crate::{
    constants::PROGRESS_INTERVAL,
    database::{sources::EventSource, sql_param::SqlParam, statements},
    dispatch::{WriteDispatcher, WriteRequest},
    error::JobError,
    model::{
        aggregate::{AccuracyAccumulator, AccuracySample, PerformanceAccumulator},
        structures::{
            mode::Mode,
            partition::{AggregateResult, PartitionKey},
            variant::Variant
        }
    },
    utils::progress_utils::progress_spinner
};
use futures::StreamExt;
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::JobConfig;

/// Accumulated state of one partition during a pass
#[derive(Debug, Clone)]
pub struct PartitionState {
    performance: PerformanceAccumulator,
    accuracy: AccuracyAccumulator
}

impl PartitionState {
    fn new(capacity: usize) -> Self {
        PartitionState {
            performance: PerformanceAccumulator::new(capacity),
            accuracy: AccuracyAccumulator::default()
        }
    }

    /// An aggregate without input finishes at 0
    pub fn finish(self) -> AggregateResult {
        AggregateResult {
            weighted_score: self.performance.finish(),
            weighted_accuracy: self.accuracy.finish()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub events: u64,
    pub skipped: u64
}

/// Streams every event once and folds it into its partition.
///
/// Performance values only count when the play is pp-eligible; accuracy is
/// collected from every play. Rows that fail to scan are logged and skipped.
#[instrument(skip(source))]
pub async fn aggregate_partitions(
    source: &dyn EventSource,
    capacity: usize
) -> Result<(IndexMap<PartitionKey, PartitionState>, PassStats), JobError> {
    let span = Span::current();
    progress_spinner(&span, "Folding events");

    let mut partitions: IndexMap<PartitionKey, PartitionState> = IndexMap::new();
    let mut stats = PassStats::default();
    let mut events = source.events().await?;

    while let Some(row) = events.next().await {
        let event = match row {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable event");
                stats.skipped += 1;
                continue;
            }
        };

        let state = partitions
            .entry(event.partition_key())
            .or_insert_with(|| PartitionState::new(capacity));

        if event.counts_for_pp {
            state.performance.admit(event.pp);
        }

        let rank_key = match event.mode {
            Mode::Std => event.pp.unwrap_or(0.0),
            _ => event.accuracy
        };
        state.accuracy.admit(AccuracySample::new(rank_key, event.accuracy));

        stats.events += 1;
        span.pb_inc(1);
        if stats.events % PROGRESS_INTERVAL == 0 {
            debug!(events = stats.events, partitions = partitions.len(), "Aggregation progress");
        }
    }

    Ok((partitions, stats))
}

/// Gives every user seen in the pass a partition for each mode and variant,
/// so a cell whose plays all stopped counting is rewritten as 0. Returns the
/// number of partitions added.
pub fn fill_missing_partitions(partitions: &mut IndexMap<PartitionKey, PartitionState>, capacity: usize) -> usize {
    let users: IndexSet<i32> = partitions.keys().map(|key| key.user_id).collect();
    let before = partitions.len();

    for user_id in users {
        for variant in Variant::iter() {
            for mode in Mode::iter() {
                partitions
                    .entry(PartitionKey::new(user_id, mode, variant))
                    .or_insert_with(|| PartitionState::new(capacity));
            }
        }
    }

    partitions.len() - before
}

/// Finishes every partition in parallel, keeping the pass order
pub fn finish_partitions(partitions: IndexMap<PartitionKey, PartitionState>) -> Vec<(PartitionKey, AggregateResult)> {
    partitions
        .into_par_iter()
        .map(|(key, state)| (key, state.finish()))
        .collect()
}

/// One cache update per partition, carrying only the enabled aggregates.
/// A disabled aggregate is bound as NULL and keeps its cached value.
pub fn cache_update_request(key: PartitionKey, result: AggregateResult, config: &JobConfig) -> Option<WriteRequest> {
    let score = config.calculate_pp.then_some(result.weighted_score);
    let accuracy = config.calculate_overall_accuracy.then_some(result.weighted_accuracy);
    if score.is_none() && accuracy.is_none() {
        return None;
    }

    Some(WriteRequest::unordered(
        statements::cache_update(key.mode, key.variant),
        vec![SqlParam::BigInt(score), SqlParam::Double(accuracy), SqlParam::Int(key.user_id)]
    ))
}

/// Recomputes the cached weighted score and accuracy of every partition and
/// waits until all of the resulting writes have been applied.
pub async fn run(source: &dyn EventSource, dispatcher: &WriteDispatcher, config: &JobConfig) -> Result<(), JobError> {
    let (mut partitions, stats) = aggregate_partitions(source, config.top_k).await?;
    let filled = fill_missing_partitions(&mut partitions, config.top_k);
    info!(
        events = stats.events,
        skipped = stats.skipped,
        partitions = partitions.len(),
        filled,
        "Fetched every event, computing aggregates"
    );

    // rayon blocks its caller until the whole finish is done
    let results = tokio::task::spawn_blocking(move || finish_partitions(partitions)).await?;

    let mut submitted = 0u64;
    for (key, result) in results {
        if let Some(request) = cache_update_request(key, result, config) {
            dispatcher.submit(request).await?;
            submitted += 1;
        }
    }

    dispatcher.flush().await;
    info!(updates = submitted, "Cached aggregates updated");

    Ok(())
}
