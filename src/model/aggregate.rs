use crate::{
    constants::{ACCURACY_WEIGHT_SCALE, WEIGHT_DECAY},
    model::top_k::{BoundedTopK, Scalar}
};

/// Rounds half away from zero (2.5 -> 3, -2.5 -> -3)
pub fn round_half_away(value: f64) -> f64 {
    value.round()
}

/// Folds the best `capacity` values of a partition into a weighted score.
///
/// The i-th largest value (0-indexed) contributes
/// `round(round(value) * 0.95^i)`. Every term is rounded on its own before
/// being added to the total.
pub fn weighted_score<I>(values: I, capacity: usize) -> i64
where
    I: IntoIterator<Item = f64>
{
    let mut acc = PerformanceAccumulator::new(capacity);
    for value in values {
        acc.admit(Some(value));
    }

    acc.finish()
}

/// Rank-weighted mean of the accuracies, ordered by each sample's rank key.
/// Returns 0 for an empty partition.
pub fn weighted_accuracy(samples: &[AccuracySample]) -> f64 {
    let mut acc = AccuracyAccumulator::default();
    for sample in samples {
        acc.admit(*sample);
    }

    acc.finish()
}

/// Streaming state for one partition's weighted score
#[derive(Debug, Clone)]
pub struct PerformanceAccumulator {
    top: BoundedTopK<Scalar>
}

impl PerformanceAccumulator {
    pub fn new(capacity: usize) -> Self {
        PerformanceAccumulator {
            top: BoundedTopK::new(capacity)
        }
    }

    /// Null values are not part of the partition and are ignored
    pub fn admit(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.top.admit(Scalar(v));
        }
    }

    /// True until a non-null value has been admitted
    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    pub fn finish(self) -> i64 {
        self.top
            .into_descending()
            .into_iter()
            .enumerate()
            .map(|(i, Scalar(value))| {
                round_half_away(round_half_away(value) * WEIGHT_DECAY.powi(i as i32)) as i64
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracySample {
    /// Field the partition is ordered by (highest first)
    pub rank_key: f64,
    pub accuracy: f64
}

impl AccuracySample {
    pub fn new(rank_key: f64, accuracy: f64) -> Self {
        AccuracySample { rank_key, accuracy }
    }
}

/// Collects a partition's accuracy samples; the whole partition is kept since
/// it only ever holds personal bests.
#[derive(Debug, Clone, Default)]
pub struct AccuracyAccumulator {
    samples: Vec<AccuracySample>
}

impl AccuracyAccumulator {
    pub fn admit(&mut self, sample: AccuracySample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn finish(mut self) -> f64 {
        self.samples.sort_by(|a, b| b.rank_key.total_cmp(&a.rank_key));

        let mut total = 0.0;
        let mut divide_total = 0.0;
        for (i, sample) in self.samples.iter().enumerate() {
            let weight = WEIGHT_DECAY.powi(i as i32) * ACCURACY_WEIGHT_SCALE;
            total += sample.accuracy * weight;
            divide_total += weight;
        }

        if divide_total == 0.0 {
            return 0.0;
        }

        total / divide_total
    }
}
