//! The top-level jobs of a processing cycle and the scheduler running them.
//!
//! Every enabled job is spawned at once. The leaderboard, ranking and
//! server-wide stats jobs wait for the aggregation job to signal completion;
//! the play totals and maintenance jobs run independently. The dispatcher is closed once every job
//! has been joined.

pub mod aggregation;
pub mod cache_data;
pub mod leaderboard;
pub mod maintenance;
pub mod ranking_cache;
pub mod serverwise_stats;

use crate::{
    constants::TOP_K_CAPACITY,
    database::sources::{EventSource, LeaderboardStore, PlaySource, RankingSource},
    dispatch::{DispatchSummary, WriteDispatcher},
    error::JobError,
    ranking_index::RankingIndex
};
use chrono::Utc;
use futures::{
    future::{BoxFuture, Shared},
    FutureExt
};
use std::{fmt, sync::Arc, time::Duration};
use strum_macros::EnumIter;
use tokio::{sync::oneshot, task::JoinSet, time::Instant};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobConfig {
    pub calculate_pp: bool,
    pub calculate_overall_accuracy: bool,
    pub build_leaderboards: bool,
    pub populate_redis: bool,
    pub serverwise_stats: bool,
    /// Cache ranked score, total hits and playtime
    pub cache_data: bool,
    pub maintenance: bool,
    /// Best performance values kept per partition
    pub top_k: usize
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            calculate_pp: false,
            calculate_overall_accuracy: false,
            build_leaderboards: false,
            populate_redis: false,
            serverwise_stats: false,
            cache_data: false,
            maintenance: false,
            top_k: TOP_K_CAPACITY
        }
    }
}

impl JobConfig {
    pub fn all() -> Self {
        JobConfig {
            calculate_pp: true,
            calculate_overall_accuracy: true,
            build_leaderboards: true,
            populate_redis: true,
            serverwise_stats: true,
            cache_data: true,
            maintenance: true,
            top_k: TOP_K_CAPACITY
        }
    }

    pub fn aggregation_enabled(&self) -> bool {
        self.calculate_pp || self.calculate_overall_accuracy
    }

    /// Whether any enabled job writes to the ranking index
    pub fn needs_index(&self) -> bool {
        self.populate_redis || self.serverwise_stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Job {
    Aggregation,
    Leaderboards,
    RankingCache,
    ServerwiseStats,
    CacheData,
    Maintenance
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Job::Aggregation => "aggregation",
            Job::Leaderboards => "leaderboards",
            Job::RankingCache => "ranking cache",
            Job::ServerwiseStats => "server-wise stats",
            Job::CacheData => "play totals",
            Job::Maintenance => "maintenance"
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed,
    Skipped
}

/// Stores the jobs read from and write to
#[derive(Clone)]
pub struct Services {
    pub events: Arc<dyn EventSource>,
    pub plays: Arc<dyn PlaySource>,
    pub rankings: Arc<dyn RankingSource>,
    /// `None` when the dedicated leaderboard connection could not be opened
    pub leaderboards: Option<Arc<dyn LeaderboardStore>>,
    /// `None` when no enabled job needs the ranking index
    pub index: Option<Arc<dyn RankingIndex>>
}

#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub outcomes: Vec<(Job, JobOutcome)>,
    pub writes: DispatchSummary,
    pub elapsed: Duration
}

impl CycleSummary {
    pub fn outcome(&self, job: Job) -> Option<JobOutcome> {
        self.outcomes.iter().find(|(j, _)| *j == job).map(|(_, o)| *o)
    }

    pub fn count(&self, outcome: JobOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

type CompletionSignal = Shared<BoxFuture<'static, JobOutcome>>;

fn report(job: Job, result: Result<(), JobError>) -> JobOutcome {
    match result {
        Ok(()) => {
            info!(%job, "Job completed");
            JobOutcome::Completed
        }
        Err(e) => {
            error!(%job, error = %e, "Job failed");
            JobOutcome::Failed
        }
    }
}

/// Waits for the aggregation job. Downstream jobs still run on stale cached
/// values when it failed.
async fn await_upstream(job: Job, upstream: CompletionSignal) {
    if upstream.await == JobOutcome::Failed {
        warn!(%job, "Aggregation failed, publishing previously cached values");
    }
}

/// Runs one full cycle: spawns every job, joins them all, then drains and
/// closes the dispatcher.
pub async fn run_cycle(services: Services, config: JobConfig, dispatcher: Arc<WriteDispatcher>) -> CycleSummary {
    let start = Instant::now();

    let (signal_tx, signal_rx) = oneshot::channel::<JobOutcome>();
    // A dropped sender means the aggregation task died
    let upstream: CompletionSignal = signal_rx.map(|r| r.unwrap_or(JobOutcome::Failed)).boxed().shared();

    let mut jobs: JoinSet<(Job, JobOutcome)> = JoinSet::new();

    {
        let events = Arc::clone(&services.events);
        let dispatcher = Arc::clone(&dispatcher);
        jobs.spawn(async move {
            let outcome = if config.aggregation_enabled() {
                report(Job::Aggregation, aggregation::run(events.as_ref(), &dispatcher, &config).await)
            } else {
                JobOutcome::Skipped
            };
            let _ = signal_tx.send(outcome);

            (Job::Aggregation, outcome)
        });
    }

    if config.build_leaderboards {
        let store = services.leaderboards.clone();
        let upstream = upstream.clone();
        jobs.spawn(async move {
            await_upstream(Job::Leaderboards, upstream).await;
            let result = match store {
                Some(store) => leaderboard::run(store.as_ref()).await,
                None => Err(JobError::Unavailable("leaderboard connection"))
            };

            (Job::Leaderboards, report(Job::Leaderboards, result))
        });
    }

    if config.populate_redis {
        let rankings = Arc::clone(&services.rankings);
        let index = services.index.clone();
        let upstream = upstream.clone();
        jobs.spawn(async move {
            await_upstream(Job::RankingCache, upstream).await;
            let result = match index {
                Some(index) => ranking_cache::run(rankings.as_ref(), index.as_ref(), Utc::now().timestamp()).await,
                None => Err(JobError::Unavailable("ranking index"))
            };

            (Job::RankingCache, report(Job::RankingCache, result))
        });
    }

    if config.serverwise_stats {
        let rankings = Arc::clone(&services.rankings);
        let index = services.index.clone();
        let upstream = upstream.clone();
        jobs.spawn(async move {
            await_upstream(Job::ServerwiseStats, upstream).await;
            let result = match index {
                Some(index) => serverwise_stats::run(rankings.as_ref(), index.as_ref()).await,
                None => Err(JobError::Unavailable("ranking index"))
            };

            (Job::ServerwiseStats, report(Job::ServerwiseStats, result))
        });
    }

    if config.cache_data {
        let plays = Arc::clone(&services.plays);
        let dispatcher = Arc::clone(&dispatcher);
        jobs.spawn(async move {
            let result = cache_data::run(plays.as_ref(), &dispatcher).await;
            (Job::CacheData, report(Job::CacheData, result))
        });
    }

    if config.maintenance {
        let dispatcher = Arc::clone(&dispatcher);
        jobs.spawn(async move {
            let result = maintenance::run(&dispatcher, Utc::now()).await;
            (Job::Maintenance, report(Job::Maintenance, result))
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("job task failed: {}", e)
        }
    }
    outcomes.sort_by_key(|(job, _)| *job as u8);
    info!(elapsed = ?start.elapsed(), "All jobs finished, draining writes");

    let writes = dispatcher.close().await;
    let elapsed = start.elapsed();
    info!(
        ?elapsed,
        completed = outcomes.iter().filter(|(_, o)| *o == JobOutcome::Completed).count(),
        failed = outcomes.iter().filter(|(_, o)| *o == JobOutcome::Failed).count(),
        writes_applied = writes.applied,
        writes_failed = writes.failed,
        "Cycle finished"
    );

    CycleSummary {
        outcomes,
        writes,
        elapsed
    }
}
