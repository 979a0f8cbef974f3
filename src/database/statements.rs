//! Every statement the processor runs.
//!
//! Column and table names depend on the mode and variant, so each template is
//! spelled out per combination and picked by a `match`. Values are always
//! bound positionally.

use crate::model::structures::{mode::Mode, variant::Variant};

/// Completed plays with everything the aggregators need.
/// `counts_for_pp` is false for plays on unranked or pp-disabled maps.
pub const RAW_EVENTS: &str = "
    SELECT s.userid AS user_id, s.play_mode AS play_mode, s.is_relax AS is_relax,
           s.pp AS pp, s.accuracy AS accuracy,
           COALESCE(b.ranked >= 2 AND b.disable_pp = 0, FALSE) AS counts_for_pp
    FROM scores s
             JOIN users u ON u.id = s.userid
             LEFT JOIN beatmaps b ON b.beatmap_md5 = s.beatmap_md5
    WHERE s.completed = 3";

/// Every submitted play on a known map, for the per-mode totals
pub const PLAY_RECORDS: &str = "
    SELECT s.userid AS user_id, s.play_mode AS play_mode, s.score AS score, s.completed AS completed,
           (s.count_300::BIGINT + s.count_100 + s.count_50) AS hits, s.playtime::BIGINT AS playtime
    FROM scores s
             JOIN users u ON u.id = s.userid
             JOIN beatmaps b ON b.beatmap_md5 = s.beatmap_md5";

/// Updates the cached weighted score and accuracy of one user.
///
/// Parameters: `$1` weighted score (BIGINT, NULL keeps the current value),
/// `$2` weighted accuracy (DOUBLE PRECISION, NULL keeps the current value),
/// `$3` user id.
pub fn cache_update(mode: Mode, variant: Variant) -> &'static str {
    match (variant, mode) {
        (Variant::Classic, Mode::Std) => "UPDATE users_stats SET pp_std = COALESCE($1, pp_std), avg_accuracy_std = COALESCE($2, avg_accuracy_std) WHERE id = $3",
        (Variant::Classic, Mode::Taiko) => "UPDATE users_stats SET pp_taiko = COALESCE($1, pp_taiko), avg_accuracy_taiko = COALESCE($2, avg_accuracy_taiko) WHERE id = $3",
        (Variant::Classic, Mode::Ctb) => "UPDATE users_stats SET pp_ctb = COALESCE($1, pp_ctb), avg_accuracy_ctb = COALESCE($2, avg_accuracy_ctb) WHERE id = $3",
        (Variant::Classic, Mode::Mania) => "UPDATE users_stats SET pp_mania = COALESCE($1, pp_mania), avg_accuracy_mania = COALESCE($2, avg_accuracy_mania) WHERE id = $3",
        (Variant::Relax, Mode::Std) => "UPDATE users_stats_relax SET pp_std = COALESCE($1, pp_std), avg_accuracy_std = COALESCE($2, avg_accuracy_std) WHERE id = $3",
        (Variant::Relax, Mode::Taiko) => "UPDATE users_stats_relax SET pp_taiko = COALESCE($1, pp_taiko), avg_accuracy_taiko = COALESCE($2, avg_accuracy_taiko) WHERE id = $3",
        (Variant::Relax, Mode::Ctb) => "UPDATE users_stats_relax SET pp_ctb = COALESCE($1, pp_ctb), avg_accuracy_ctb = COALESCE($2, avg_accuracy_ctb) WHERE id = $3",
        (Variant::Relax, Mode::Mania) => "UPDATE users_stats_relax SET pp_mania = COALESCE($1, pp_mania), avg_accuracy_mania = COALESCE($2, avg_accuracy_mania) WHERE id = $3"
    }
}

/// Overwrites the per-mode totals of one user.
///
/// Parameters: `$1` ranked score, `$2` total hits, `$3` playtime (all BIGINT),
/// `$4` user id.
pub fn play_totals_update(mode: Mode) -> &'static str {
    match mode {
        Mode::Std => "UPDATE users_stats SET ranked_score_std = $1, total_hits_std = $2, playtime_std = $3 WHERE id = $4",
        Mode::Taiko => "UPDATE users_stats SET ranked_score_taiko = $1, total_hits_taiko = $2, playtime_taiko = $3 WHERE id = $4",
        Mode::Ctb => "UPDATE users_stats SET ranked_score_ctb = $1, total_hits_ctb = $2, playtime_ctb = $3 WHERE id = $4",
        Mode::Mania => "UPDATE users_stats SET ranked_score_mania = $1, total_hits_mania = $2, playtime_mania = $3 WHERE id = $4"
    }
}

/// `(user_id, value)` of every public user, for the classic leaderboard of a mode
pub fn leaderboard_source(mode: Mode) -> &'static str {
    match mode {
        Mode::Std => "SELECT s.id AS user_id, s.pp_std AS value FROM users_stats s JOIN users u ON u.id = s.id WHERE u.privileges & 1 > 0",
        Mode::Taiko => "SELECT s.id AS user_id, s.pp_taiko AS value FROM users_stats s JOIN users u ON u.id = s.id WHERE u.privileges & 1 > 0",
        Mode::Ctb => "SELECT s.id AS user_id, s.pp_ctb AS value FROM users_stats s JOIN users u ON u.id = s.id WHERE u.privileges & 1 > 0",
        Mode::Mania => "SELECT s.id AS user_id, s.pp_mania AS value FROM users_stats s JOIN users u ON u.id = s.id WHERE u.privileges & 1 > 0"
    }
}

/// Blocks readers and writers of the leaderboard until the transaction ends
pub fn leaderboard_lock(mode: Mode) -> &'static str {
    match mode {
        Mode::Std => "LOCK TABLE leaderboard_std IN ACCESS EXCLUSIVE MODE",
        Mode::Taiko => "LOCK TABLE leaderboard_taiko IN ACCESS EXCLUSIVE MODE",
        Mode::Ctb => "LOCK TABLE leaderboard_ctb IN ACCESS EXCLUSIVE MODE",
        Mode::Mania => "LOCK TABLE leaderboard_mania IN ACCESS EXCLUSIVE MODE"
    }
}

pub fn leaderboard_clear(mode: Mode) -> &'static str {
    match mode {
        Mode::Std => "DELETE FROM leaderboard_std",
        Mode::Taiko => "DELETE FROM leaderboard_taiko",
        Mode::Ctb => "DELETE FROM leaderboard_ctb",
        Mode::Mania => "DELETE FROM leaderboard_mania"
    }
}

/// Bulk insert from three parallel arrays: positions, user ids, values
pub fn leaderboard_insert(mode: Mode) -> &'static str {
    match mode {
        Mode::Std => "INSERT INTO leaderboard_std (position, user_id, v) SELECT * FROM UNNEST($1::INTEGER[], $2::INTEGER[], $3::BIGINT[])",
        Mode::Taiko => "INSERT INTO leaderboard_taiko (position, user_id, v) SELECT * FROM UNNEST($1::INTEGER[], $2::INTEGER[], $3::BIGINT[])",
        Mode::Ctb => "INSERT INTO leaderboard_ctb (position, user_id, v) SELECT * FROM UNNEST($1::INTEGER[], $2::INTEGER[], $3::BIGINT[])",
        Mode::Mania => "INSERT INTO leaderboard_mania (position, user_id, v) SELECT * FROM UNNEST($1::INTEGER[], $2::INTEGER[], $3::BIGINT[])"
    }
}

pub fn leaderboard_snapshot(mode: Mode) -> &'static str {
    match mode {
        Mode::Std => "SELECT position, user_id, v FROM leaderboard_std ORDER BY position",
        Mode::Taiko => "SELECT position, user_id, v FROM leaderboard_taiko ORDER BY position",
        Mode::Ctb => "SELECT position, user_id, v FROM leaderboard_ctb ORDER BY position",
        Mode::Mania => "SELECT position, user_id, v FROM leaderboard_mania ORDER BY position"
    }
}

/// Country, per-mode score and playcount, and last activity of every public user
pub fn ranking_source(variant: Variant) -> &'static str {
    match variant {
        Variant::Classic => "
            SELECT s.id AS user_id, s.country AS country,
                   s.pp_std, s.pp_taiko, s.pp_ctb, s.pp_mania,
                   s.playcount_std, s.playcount_taiko, s.playcount_ctb, s.playcount_mania,
                   u.latest_activity AS latest_activity
            FROM users_stats s
                     JOIN users u ON u.id = s.id
            WHERE u.privileges & 1 > 0",
        Variant::Relax => "
            SELECT r.id AS user_id, s.country AS country,
                   r.pp_std, r.pp_taiko, r.pp_ctb, r.pp_mania,
                   r.playcount_std, r.playcount_taiko, r.playcount_ctb, r.playcount_mania,
                   u.latest_activity AS latest_activity
            FROM users_stats_relax r
                     JOIN users_stats s ON s.id = r.id
                     JOIN users u ON u.id = r.id
            WHERE u.privileges & 1 > 0"
    }
}

pub const TOTAL_SUBMITTED_SCORES: &str = "SELECT COUNT(id) FROM scores";
pub const TOTAL_PLAYS: &str =
    "SELECT COALESCE(SUM(playcount_std + playcount_taiko + playcount_ctb + playcount_mania), 0)::BIGINT FROM users_stats";
pub const TOTAL_PP: &str = "SELECT COALESCE(SUM(pp_std + pp_taiko + pp_ctb + pp_mania), 0)::BIGINT FROM users_stats";

pub const DELETE_EXPIRED_PASSWORD_RESETS: &str = "DELETE FROM password_recovery WHERE t < NOW() - INTERVAL '1 day'";
/// `$1` cutoff timestamp
pub const DELETE_STALE_PRIVATE_TOKENS: &str = "DELETE FROM tokens WHERE private = 1 AND last_updated < $1";
