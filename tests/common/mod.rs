use rank_processor::{
    database::sources::{EventSource, LeaderboardStore, PlaySource, RankingSource},
    dispatch::{DispatcherConfig, WriteDispatcher, WriteExecutor},
    jobs::Services,
    ranking_index::RankingIndex,
    utils::test_utils::{MemoryPlaySource, MemoryRankingIndex, MemoryStatsStore}
};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize test environment with RUST_LOG=WARN
pub fn init_test_env() {
    INIT.call_once(|| {
        std::env::set_var("RUST_LOG", "warn");
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Services backed entirely by in-memory stores, plus a dispatcher writing
/// into `store`. There are no plays until `services.plays` is replaced.
pub fn memory_services(
    events: Arc<dyn EventSource>,
    store: &Arc<MemoryStatsStore>,
    index: &Arc<MemoryRankingIndex>
) -> (Services, Arc<WriteDispatcher>) {
    let services = Services {
        events,
        plays: Arc::new(MemoryPlaySource::default()) as Arc<dyn PlaySource>,
        rankings: Arc::clone(store) as Arc<dyn RankingSource>,
        leaderboards: Some(Arc::clone(store) as Arc<dyn LeaderboardStore>),
        index: Some(Arc::clone(index) as Arc<dyn RankingIndex>)
    };
    let dispatcher = WriteDispatcher::start(
        Arc::clone(store) as Arc<dyn WriteExecutor>,
        DispatcherConfig {
            workers: 4,
            queue_capacity: 64,
            ordered_capacity: 8
        }
    );

    (services, Arc::new(dispatcher))
}
