use clap::Parser;
use rank_processor::{
    args::Args,
    database::{
        db::{DbClient, LeaderboardDb},
        sources::LeaderboardStore
    },
    dispatch::WriteDispatcher,
    jobs::{run_cycle, JobOutcome, Services},
    ranking_index::{RankingIndex, RedisRankingIndex}
};
use std::{process::ExitCode, sync::Arc};
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(log_level: &str) {
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = args.job_config();

    let db = match DbClient::connect(&args.connection_string).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, "Could not connect to the database");
            return ExitCode::FAILURE;
        }
    };

    let index: Option<Arc<dyn RankingIndex>> = if config.needs_index() {
        match RedisRankingIndex::connect(&args.redis_url).await {
            Ok(index) => Some(Arc::new(index)),
            Err(e) => {
                error!(error = %e, "Could not connect to the ranking index");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let leaderboards: Option<Arc<dyn LeaderboardStore>> = if config.build_leaderboards {
        match LeaderboardDb::connect(&args.connection_string).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "Could not open the leaderboard connection, leaderboards will not be built");
                None
            }
        }
    } else {
        None
    };

    let services = Services {
        events: db.clone(),
        plays: db.clone(),
        rankings: db.clone(),
        leaderboards,
        index
    };

    let dispatcher = Arc::new(WriteDispatcher::start(db, args.dispatcher_config()));
    let summary = run_cycle(services, config, dispatcher).await;

    info!(
        completed = summary.count(JobOutcome::Completed),
        failed = summary.count(JobOutcome::Failed),
        skipped = summary.count(JobOutcome::Skipped),
        "Done"
    );

    ExitCode::SUCCESS
}
