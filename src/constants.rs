/// Number of best performance values folded into a weighted score
pub const TOP_K_CAPACITY: usize = 500;

/// Per-position decay applied to both the weighted score and weighted accuracy
pub const WEIGHT_DECAY: f64 = 0.95;

/// Scale applied to accuracy weights (kept for parity with the site's own formula)
pub const ACCURACY_WEIGHT_SCALE: f64 = 100.0;

/// `scores.completed` value of a user's personal best on a map
pub const PERSONAL_BEST: i32 = 3;

/// Processed events between two progress log lines
pub const PROGRESS_INTERVAL: u64 = 100_000;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days of inactivity tolerated per unit of ln(playcount)
pub const INACTIVITY_DAYS_PER_LN_PLAYCOUNT: f64 = 16.0;

/// Country code used by the site for users without a known country
pub const UNKNOWN_COUNTRY: &str = "xx";

pub const LEADERBOARD_NAMESPACE: &str = "ripple:leaderboard";
pub const COUNTRY_LIST_KEY: &str = "hanayo:country_list";
pub const RELAX_SUFFIX: &str = "relax";

pub const TOTAL_SUBMITTED_SCORES_KEY: &str = "ripple:total_submitted_scores";
pub const TOTAL_PLAYS_KEY: &str = "ripple:total_plays";
pub const TOTAL_PP_KEY: &str = "ripple:total_pp";

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;
pub const ORDERED_QUEUE_CAPACITY: usize = 1_024;

/// Ranking index writes sent per pipelined round trip
pub const INDEX_BATCH_SIZE: usize = 1_000;

/// Private API tokens untouched for this many days are deleted by maintenance
pub const PRIVATE_TOKEN_MAX_AGE_DAYS: i64 = 30;
