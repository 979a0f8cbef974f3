use serde::Serialize;

use super::{mode::Mode, variant::Variant};

/// The unit of aggregation. Every event sharing a key folds into one [`AggregateResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PartitionKey {
    pub user_id: i32,
    pub mode: Mode,
    pub variant: Variant
}

impl PartitionKey {
    pub fn new(user_id: i32, mode: Mode, variant: Variant) -> Self {
        PartitionKey { user_id, mode, variant }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateResult {
    /// Rank-decayed sum over the best performance values
    pub weighted_score: i64,
    /// Rank-decayed mean over the personal-best accuracies, in [0, 100]
    pub weighted_accuracy: f64
}
