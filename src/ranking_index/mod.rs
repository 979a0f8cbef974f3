pub mod redis_index;

pub use redis_index::RedisRankingIndex;

use crate::{
    constants::{LEADERBOARD_NAMESPACE, RELAX_SUFFIX},
    error::IndexError,
    model::structures::{mode::Mode, variant::Variant}
};
use async_trait::async_trait;

/// One sorted-set write
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    /// Sets the member's score, inserting it if missing
    AddMember { key: String, member: String, score: f64 },
    /// Adds `by` to the member's score, inserting it at 0 first if missing
    IncrementMember { key: String, member: String, by: f64 }
}

#[async_trait]
pub trait RankingIndex: Send + Sync {
    /// Deletes every key under `prefix` plus `extra_keys` in one atomic step.
    /// Returns the number of keys removed.
    async fn clear_namespace(&self, prefix: &str, extra_keys: &[&str]) -> Result<u64, IndexError>;

    /// Applies a batch of sorted-set writes in order
    async fn apply(&self, ops: &[IndexOp]) -> Result<(), IndexError>;

    async fn set_value(&self, key: &str, value: i64) -> Result<(), IndexError>;
}

/// Sorted-set key of a ranking: `ripple:leaderboard:{mode}[:{country}][:relax]`
pub fn ranking_key(mode: Mode, variant: Variant, country: Option<&str>) -> String {
    let mut key = format!("{}:{}", LEADERBOARD_NAMESPACE, mode.as_str());
    if let Some(country) = country {
        key.push(':');
        key.push_str(country);
    }
    if variant == Variant::Relax {
        key.push(':');
        key.push_str(RELAX_SUFFIX);
    }

    key
}
