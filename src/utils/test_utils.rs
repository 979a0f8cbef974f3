//! In-memory stores and data generators for tests and benches.

use crate::{
    database::{
        db_structs::{LeaderboardEntry, ModeStanding, PlayRecord, PlayTotals, RankingRow, RawEvent, ServerTotals},
        sources::{EventSource, LeaderboardStore, PlaySource, RankingSource, RowStream},
        statements
    },
    dispatch::{WriteExecutor, WriteRequest},
    error::{DbError, IndexError},
    model::structures::{mode::Mode, variant::Variant},
    ranking_index::{IndexOp, RankingIndex}
};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
    time::Duration
};
use strum::IntoEnumIterator;
use tokio::sync::RwLock;

pub fn event(user_id: i32, mode: Mode, variant: Variant, pp: Option<f64>, accuracy: f64) -> RawEvent {
    RawEvent {
        user_id,
        mode,
        variant,
        pp,
        accuracy,
        counts_for_pp: true
    }
}

pub fn play(user_id: i32, mode: Mode, score: i64, completed: i32, hits: i64, playtime: i64) -> PlayRecord {
    PlayRecord {
        user_id,
        mode,
        score,
        completed,
        hits,
        playtime
    }
}

/// Reproducible random events spread across every mode and variant
pub fn generate_events(seed: u64, users: i32, per_user: usize) -> Vec<RawEvent> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let modes: Vec<Mode> = Mode::iter().collect();

    let mut events = Vec::with_capacity(users as usize * per_user);
    for user_id in 1..=users {
        for _ in 0..per_user {
            let mode = modes[rng.random_range(0..modes.len())];
            let variant = if rng.random_bool(0.2) {
                Variant::Relax
            } else {
                Variant::Classic
            };
            let pp = rng.random_bool(0.9).then(|| rng.random_range(0.0..800.0));

            events.push(RawEvent {
                user_id,
                mode,
                variant,
                pp,
                accuracy: rng.random_range(60.0..=100.0),
                counts_for_pp: rng.random_bool(0.95)
            });
        }
    }

    events
}

/// Serves a fixed list of events. Rows added through [`with_bad_row`](Self::with_bad_row)
/// come out as scan errors.
#[derive(Default)]
pub struct MemoryEventSource {
    rows: Vec<Result<RawEvent, i32>>
}

impl MemoryEventSource {
    pub fn new(events: Vec<RawEvent>) -> Self {
        MemoryEventSource {
            rows: events.into_iter().map(Ok).collect()
        }
    }

    /// Appends a row carrying an unknown play mode
    pub fn with_bad_row(mut self, play_mode: i32) -> Self {
        self.rows.push(Err(play_mode));
        self
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn events(&self) -> Result<RowStream<RawEvent>, DbError> {
        let rows: Vec<Result<RawEvent, DbError>> = self
            .rows
            .iter()
            .map(|row| row.clone().map_err(DbError::UnknownMode))
            .collect();

        Ok(stream::iter(rows).boxed())
    }
}

/// Serves a fixed list of plays, with optional scan errors like [`MemoryEventSource`]
#[derive(Default)]
pub struct MemoryPlaySource {
    rows: Vec<Result<PlayRecord, i32>>
}

impl MemoryPlaySource {
    pub fn new(plays: Vec<PlayRecord>) -> Self {
        MemoryPlaySource {
            rows: plays.into_iter().map(Ok).collect()
        }
    }

    pub fn with_bad_row(mut self, play_mode: i32) -> Self {
        self.rows.push(Err(play_mode));
        self
    }
}

#[async_trait]
impl PlaySource for MemoryPlaySource {
    async fn plays(&self) -> Result<RowStream<PlayRecord>, DbError> {
        let rows: Vec<Result<PlayRecord, DbError>> = self
            .rows
            .iter()
            .map(|row| row.clone().map_err(DbError::UnknownMode))
            .collect();

        Ok(stream::iter(rows).boxed())
    }
}

type FailWhen = Box<dyn Fn(&WriteRequest) -> bool + Send + Sync>;

/// Keeps every successfully executed request
#[derive(Default)]
pub struct RecordingExecutor {
    requests: Mutex<Vec<WriteRequest>>,
    fail_when: Option<FailWhen>,
    delay: Option<Duration>
}

impl RecordingExecutor {
    /// Rejects every request matching `predicate`
    pub fn failing_on<F>(predicate: F) -> Self
    where
        F: Fn(&WriteRequest) -> bool + Send + Sync + 'static
    {
        RecordingExecutor {
            fail_when: Some(Box::new(predicate)),
            ..Default::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        RecordingExecutor {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<WriteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WriteExecutor for RecordingExecutor {
    async fn execute(&self, request: &WriteRequest) -> Result<u64, DbError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_when.as_ref().is_some_and(|f| f(request)) {
            return Err(DbError::Rejected(request.query.to_string()));
        }

        self.requests.lock().unwrap().push(request.clone());
        Ok(1)
    }
}

/// One row of `users` joined with both stats tables
#[derive(Debug, Clone)]
pub struct MemoryUser {
    pub country: Option<String>,
    /// Unix seconds
    pub latest_activity: i64,
    /// Whether the user passes the `privileges & 1` check
    pub public: bool,
    /// Indexed by variant, then mode
    pub standings: [[ModeStanding; 4]; 2],
    pub accuracy: [[f64; 4]; 2],
    /// Classic table only, indexed by mode
    pub play_totals: [PlayTotals; 4]
}

impl MemoryUser {
    pub fn new(country: Option<&str>, latest_activity: i64) -> Self {
        MemoryUser {
            country: country.map(str::to_string),
            latest_activity,
            public: true,
            standings: [[ModeStanding::default(); 4]; 2],
            accuracy: [[0.0; 4]; 2],
            play_totals: [PlayTotals::default(); 4]
        }
    }

    pub fn with_standing(mut self, variant: Variant, mode: Mode, score: i64, playcount: i32) -> Self {
        self.standings[variant as usize][mode.index()] = ModeStanding { score, playcount };
        self
    }

    pub fn restricted(mut self) -> Self {
        self.public = false;
        self
    }
}

/// Relational store stand-in: the cached stats tables plus the leaderboard tables.
///
/// Cache updates are recognized by statement template; any other request is
/// recorded and affects nothing.
#[derive(Default)]
pub struct MemoryStatsStore {
    users: Mutex<BTreeMap<i32, MemoryUser>>,
    leaderboards: RwLock<HashMap<Mode, Vec<LeaderboardEntry>>>,
    executed: Mutex<Vec<WriteRequest>>,
    /// Pause between inserted rows while a leaderboard is being replaced
    replace_step_delay: Option<Duration>
}

impl MemoryStatsStore {
    pub fn new(users: impl IntoIterator<Item = (i32, MemoryUser)>) -> Self {
        MemoryStatsStore {
            users: Mutex::new(users.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn with_replace_step_delay(mut self, delay: Duration) -> Self {
        self.replace_step_delay = Some(delay);
        self
    }

    pub fn user(&self, user_id: i32) -> Option<MemoryUser> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    pub fn executed(&self) -> Vec<WriteRequest> {
        self.executed.lock().unwrap().clone()
    }

    pub async fn seed_leaderboard(&self, mode: Mode, entries: Vec<LeaderboardEntry>) {
        self.leaderboards.write().await.insert(mode, entries);
    }

    fn apply_cache_update(&self, mode: Mode, variant: Variant, request: &WriteRequest) -> u64 {
        let (Some(score), Some(accuracy), Some(user_id)) = (
            request.params.first(),
            request.params.get(1),
            request.params.get(2).and_then(|p| p.as_int())
        ) else {
            return 0;
        };

        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&user_id) else {
            return 0;
        };

        if let Some(score) = score.as_big_int() {
            user.standings[variant as usize][mode.index()].score = score;
        }
        if let Some(accuracy) = accuracy.as_double() {
            user.accuracy[variant as usize][mode.index()] = accuracy;
        }

        1
    }

    fn apply_play_totals(&self, mode: Mode, request: &WriteRequest) -> u64 {
        let values: Vec<Option<i64>> = request.params.iter().take(3).map(|p| p.as_big_int()).collect();
        let (Some(user_id), [Some(ranked_score), Some(total_hits), Some(playtime)]) =
            (request.params.get(3).and_then(|p| p.as_int()), values.as_slice())
        else {
            return 0;
        };

        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&user_id) else {
            return 0;
        };

        user.play_totals[mode.index()] = PlayTotals {
            ranked_score: *ranked_score,
            total_hits: *total_hits,
            playtime: *playtime
        };

        1
    }
}

#[async_trait]
impl WriteExecutor for MemoryStatsStore {
    async fn execute(&self, request: &WriteRequest) -> Result<u64, DbError> {
        self.executed.lock().unwrap().push(request.clone());

        for variant in Variant::iter() {
            for mode in Mode::iter() {
                if statements::cache_update(mode, variant) == request.query {
                    return Ok(self.apply_cache_update(mode, variant, request));
                }
            }
        }
        for mode in Mode::iter() {
            if statements::play_totals_update(mode) == request.query {
                return Ok(self.apply_play_totals(mode, request));
            }
        }

        Ok(0)
    }
}

#[async_trait]
impl LeaderboardStore for MemoryStatsStore {
    async fn ranked_values(&self, mode: Mode) -> Result<Vec<(i32, i64)>, DbError> {
        let users = self.users.lock().unwrap();

        Ok(users
            .iter()
            .filter(|(_, u)| u.public)
            .map(|(id, u)| (*id, u.standings[Variant::Classic as usize][mode.index()].score))
            .collect())
    }

    async fn replace_leaderboard(&self, mode: Mode, entries: &[LeaderboardEntry]) -> Result<(), DbError> {
        let mut tables = self.leaderboards.write().await;
        let table = tables.entry(mode).or_default();

        table.clear();
        for entry in entries {
            table.push(entry.clone());
            if let Some(delay) = self.replace_step_delay {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(())
    }

    async fn leaderboard(&self, mode: Mode) -> Result<Vec<LeaderboardEntry>, DbError> {
        Ok(self.leaderboards.read().await.get(&mode).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl RankingSource for MemoryStatsStore {
    async fn ranking_rows(&self, variant: Variant) -> Result<RowStream<RankingRow>, DbError> {
        let rows: Vec<Result<RankingRow, DbError>> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u)| u.public)
            .map(|(id, u)| {
                Ok(RankingRow {
                    user_id: *id,
                    country: u.country.clone(),
                    standings: u.standings[variant as usize],
                    latest_activity: u.latest_activity
                })
            })
            .collect();

        Ok(stream::iter(rows).boxed())
    }

    async fn server_totals(&self) -> Result<ServerTotals, DbError> {
        let users = self.users.lock().unwrap();
        let classic = users.values().flat_map(|u| u.standings[Variant::Classic as usize]);

        let (plays, pp) = classic.fold((0i64, 0i64), |(plays, pp), s| (plays + s.playcount as i64, pp + s.score));

        Ok(ServerTotals {
            submitted_scores: 0,
            plays,
            pp
        })
    }
}

/// Sorted sets and plain values kept in maps
#[derive(Default)]
pub struct MemoryRankingIndex {
    sets: Mutex<HashMap<String, HashMap<String, f64>>>,
    values: Mutex<HashMap<String, i64>>
}

impl MemoryRankingIndex {
    /// Members of a sorted set, highest score first
    pub fn members(&self, key: &str) -> Vec<(String, f64)> {
        let sets = self.sets.lock().unwrap();
        let mut members: Vec<(String, f64)> = sets
            .get(key)
            .map(|set| set.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();
        members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        members
    }

    pub fn score(&self, key: &str, member: &str) -> Option<f64> {
        self.sets.lock().unwrap().get(key).and_then(|set| set.get(member).copied())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sets.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn value(&self, key: &str) -> Option<i64> {
        self.values.lock().unwrap().get(key).copied()
    }

    pub fn insert(&self, key: &str, member: &str, score: f64) {
        self.sets
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
    }
}

#[async_trait]
impl RankingIndex for MemoryRankingIndex {
    async fn clear_namespace(&self, prefix: &str, extra_keys: &[&str]) -> Result<u64, IndexError> {
        let namespace = format!("{}:", prefix);
        let mut sets = self.sets.lock().unwrap();
        let mut values = self.values.lock().unwrap();

        let before = sets.len() + values.len();
        sets.retain(|key, _| !key.starts_with(&namespace) && !extra_keys.contains(&key.as_str()));
        values.retain(|key, _| !key.starts_with(&namespace) && !extra_keys.contains(&key.as_str()));

        Ok((before - sets.len() - values.len()) as u64)
    }

    async fn apply(&self, ops: &[IndexOp]) -> Result<(), IndexError> {
        let mut sets = self.sets.lock().unwrap();
        for op in ops {
            match op {
                IndexOp::AddMember { key, member, score } => {
                    sets.entry(key.clone()).or_default().insert(member.clone(), *score);
                }
                IndexOp::IncrementMember { key, member, by } => {
                    *sets.entry(key.clone()).or_default().entry(member.clone()).or_insert(0.0) += by;
                }
            }
        }

        Ok(())
    }

    async fn set_value(&self, key: &str, value: i64) -> Result<(), IndexError> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[test]
    fn test_generate_events_is_reproducible() {
        let a = generate_events(7, 10, 20);
        let b = generate_events(7, 10, 20);

        assert_eq!(a.len(), 200);
        assert_eq!(a, b);
        assert!(a.iter().all(|e| (60.0..=100.0).contains(&e.accuracy)));
    }

    #[tokio::test]
    async fn test_memory_event_source_yields_bad_rows_as_errors() {
        let source = MemoryEventSource::new(vec![event(1, Mode::Std, Variant::Classic, Some(1.0), 99.0)]).with_bad_row(9);
        let rows: Vec<_> = source.events().await.unwrap().collect().await;

        assert!(rows[0].is_ok());
        assert!(matches!(rows[1], Err(DbError::UnknownMode(9))));
    }

    #[tokio::test]
    async fn test_cache_update_applies_non_null_params_only() {
        use crate::database::sql_param::SqlParam;

        let store = MemoryStatsStore::new([(1, MemoryUser::new(None, 0))]);
        let query = statements::cache_update(Mode::Taiko, Variant::Relax);

        let rows = store
            .execute(&WriteRequest::unordered(
                query,
                vec![SqlParam::BigInt(Some(321)), SqlParam::Double(None), SqlParam::Int(1)]
            ))
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let user = store.user(1).unwrap();
        assert_eq!(user.standings[Variant::Relax as usize][Mode::Taiko.index()].score, 321);
        assert_eq!(user.accuracy[Variant::Relax as usize][Mode::Taiko.index()], 0.0);

        // Unknown users are not created
        let rows = store
            .execute(&WriteRequest::unordered(
                query,
                vec![SqlParam::BigInt(Some(1)), SqlParam::Double(None), SqlParam::Int(2)]
            ))
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_play_totals_update_overwrites_mode() {
        use crate::database::sql_param::SqlParam;

        let store = MemoryStatsStore::new([(5, MemoryUser::new(None, 0))]);
        let rows = store
            .execute(&WriteRequest::unordered(
                statements::play_totals_update(Mode::Mania),
                vec![
                    SqlParam::BigInt(Some(100)),
                    SqlParam::BigInt(Some(20)),
                    SqlParam::BigInt(Some(3)),
                    SqlParam::Int(5),
                ]
            ))
            .await
            .unwrap();

        assert_eq!(rows, 1);
        assert_eq!(
            store.user(5).unwrap().play_totals[Mode::Mania.index()],
            PlayTotals {
                ranked_score: 100,
                total_hits: 20,
                playtime: 3
            }
        );
        assert_eq!(store.user(5).unwrap().play_totals[Mode::Std.index()], PlayTotals::default());
    }

    #[tokio::test]
    async fn test_clear_namespace_leaves_other_keys() {
        let index = MemoryRankingIndex::default();
        index.insert("ripple:leaderboard:std", "1", 10.0);
        index.insert("ripple:leaderboard:std:de", "1", 10.0);
        index.insert("hanayo:country_list", "de", 1.0);
        index.insert("unrelated", "x", 1.0);

        let deleted = index
            .clear_namespace("ripple:leaderboard", &["hanayo:country_list"])
            .await
            .unwrap();

        assert_eq!(deleted, 3);
        assert_eq!(index.keys(), vec!["unrelated".to_string()]);
    }

    #[tokio::test]
    async fn test_ranking_rows_skip_restricted_users() {
        let store = MemoryStatsStore::new([
            (1, MemoryUser::new(Some("de"), 0)),
            (2, MemoryUser::new(None, 0).restricted())
        ]);

        let rows: Vec<RankingRow> = store
            .ranking_rows(Variant::Classic)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, 1);
    }
}
