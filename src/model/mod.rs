pub mod aggregate;
pub mod structures;
pub mod top_k;

pub use aggregate::{weighted_accuracy, weighted_score, AccuracySample};
pub use structures::{
    mode::Mode,
    partition::{AggregateResult, PartitionKey},
    variant::Variant
};
