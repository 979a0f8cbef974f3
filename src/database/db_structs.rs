use crate::{
    constants::PERSONAL_BEST,
    model::structures::{mode::Mode, partition::PartitionKey, variant::Variant}
};
use serde::Serialize;

/// One completed play, as read from `scores`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEvent {
    pub user_id: i32,
    pub mode: Mode,
    pub variant: Variant,
    /// Absent for plays the performance calculator never rated
    pub pp: Option<f64>,
    pub accuracy: f64,
    /// Whether the play is on a ranked map with pp enabled
    pub counts_for_pp: bool
}

impl RawEvent {
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.user_id, self.mode, self.variant)
    }
}

/// Any submitted play, personal best or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayRecord {
    pub user_id: i32,
    pub mode: Mode,
    pub score: i64,
    pub completed: i32,
    /// 300s, 100s and 50s
    pub hits: i64,
    /// Seconds
    pub playtime: i64
}

impl PlayRecord {
    pub fn is_personal_best(&self) -> bool {
        self.completed == PERSONAL_BEST
    }
}

/// Per-mode totals cached next to the weighted score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayTotals {
    /// Sum of personal-best scores
    pub ranked_score: i64,
    pub total_hits: i64,
    pub playtime: i64
}

impl PlayTotals {
    pub fn add(&mut self, play: &PlayRecord) {
        if play.is_personal_best() {
            self.ranked_score += play.score;
        }
        self.total_hits += play.hits;
        self.playtime += play.playtime;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub mode: Mode,
    /// 1-based
    pub position: i32,
    pub user_id: i32,
    pub value: i64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeStanding {
    pub score: i64,
    pub playcount: i32
}

/// Per-user row feeding the ranking index, for one variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub user_id: i32,
    pub country: Option<String>,
    /// Indexed by [`Mode::index`]
    pub standings: [ModeStanding; 4],
    /// Unix seconds
    pub latest_activity: i64
}

impl RankingRow {
    pub fn standing(&self, mode: Mode) -> ModeStanding {
        self.standings[mode.index()]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServerTotals {
    pub submitted_scores: i64,
    pub plays: i64,
    pub pp: i64
}
