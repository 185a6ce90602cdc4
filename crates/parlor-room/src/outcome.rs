//! Outcome recording and the leaderboard.
//!
//! Rooms hand win/lose/score events to an [`OutcomeSink`]. Recording is
//! best-effort: a failing sink is logged by the room and gameplay goes
//! on. [`MemoryOutcomeSink`] keeps everything in process and answers the
//! leaderboard query; [`LogOutcomeSink`] only writes log lines.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parlor_protocol::{PlayerId, RoomName};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::SinkError;

/// How a game ended for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeResult {
    Win,
    Lose,
    /// Final score of a simulation game (snake length gained).
    Score(u32),
}

impl fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win => f.write_str("win"),
            Self::Lose => f.write_str("lose"),
            Self::Score(score) => write!(f, "{score}"),
        }
    }
}

/// One recordable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub player: PlayerId,
    pub room: RoomName,
    pub result: OutcomeResult,
}

impl Outcome {
    pub fn win(player: PlayerId, room: &RoomName) -> Self {
        Self {
            player,
            room: room.clone(),
            result: OutcomeResult::Win,
        }
    }

    pub fn lose(player: PlayerId, room: &RoomName) -> Self {
        Self {
            player,
            room: room.clone(),
            result: OutcomeResult::Lose,
        }
    }

    pub fn score(player: PlayerId, room: &RoomName, score: u32) -> Self {
        Self {
            player,
            room: room.clone(),
            result: OutcomeResult::Score(score),
        }
    }
}

/// Destination for outcome records.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Stores one outcome.
    async fn record(&self, outcome: &Outcome) -> Result<(), SinkError>;
}

/// Sink that only logs each outcome at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOutcomeSink;

#[async_trait]
impl OutcomeSink for LogOutcomeSink {
    async fn record(&self, outcome: &Outcome) -> Result<(), SinkError> {
        tracing::info!(
            room = %outcome.room,
            player = %outcome.player,
            result = %outcome.result,
            "outcome"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory sink + leaderboard
// ---------------------------------------------------------------------------

/// A stored outcome with its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedOutcome {
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
    /// Insertion order; breaks timestamp ties.
    pub seq: u64,
}

/// Leaderboard filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// SQL `LIKE` pattern over room names: `%` matches any run, `_`
    /// exactly one character. `None` matches every room.
    pub room_pattern: Option<String>,
    /// Row limit. `None` or anything outside `1..=100` means 10.
    pub limit: Option<usize>,
}

impl LeaderboardQuery {
    pub const DEFAULT_LIMIT: usize = 10;
    pub const MAX_LIMIT: usize = 100;

    pub fn effective_limit(&self) -> usize {
        match self.limit {
            Some(limit) if (1..=Self::MAX_LIMIT).contains(&limit) => limit,
            _ => Self::DEFAULT_LIMIT,
        }
    }

    pub fn effective_pattern(&self) -> &str {
        self.room_pattern.as_deref().unwrap_or("%")
    }
}

/// One leaderboard row: a player's best score in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub player: PlayerId,
    pub room: RoomName,
    pub best_score: u32,
    pub games_played: u32,
    pub last_played: DateTime<Utc>,
}

/// Keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct MemoryOutcomeSink {
    records: Mutex<Vec<RecordedOutcome>>,
}

impl MemoryOutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, oldest first.
    pub async fn records(&self) -> Vec<RecordedOutcome> {
        self.records.lock().await.clone()
    }

    /// Plain outcomes, oldest first.
    pub async fn outcomes(&self) -> Vec<Outcome> {
        self.records
            .lock()
            .await
            .iter()
            .map(|r| r.outcome.clone())
            .collect()
    }

    /// Best score per (player, room) among rooms matching the pattern,
    /// ordered by best score then most recent play, both descending.
    /// Win/lose records are not ranked.
    pub async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
    ) -> Vec<LeaderboardRow> {
        let pattern = query.effective_pattern();
        let records = self.records.lock().await;

        // (player, room) -> (row, seq of latest record)
        let mut groups: HashMap<(PlayerId, RoomName), (LeaderboardRow, u64)> =
            HashMap::new();
        for rec in records.iter() {
            let OutcomeResult::Score(score) = rec.outcome.result else {
                continue;
            };
            if !like(pattern, rec.outcome.room.as_str()) {
                continue;
            }
            let key = (rec.outcome.player, rec.outcome.room.clone());
            let (row, last_seq) = groups.entry(key).or_insert_with(|| {
                (
                    LeaderboardRow {
                        player: rec.outcome.player,
                        room: rec.outcome.room.clone(),
                        best_score: score,
                        games_played: 0,
                        last_played: rec.recorded_at,
                    },
                    rec.seq,
                )
            });
            row.best_score = row.best_score.max(score);
            row.games_played += 1;
            if rec.seq >= *last_seq {
                *last_seq = rec.seq;
                row.last_played = rec.recorded_at;
            }
        }
        drop(records);

        let mut rows: Vec<_> = groups.into_values().collect();
        rows.sort_by(|(a, a_seq), (b, b_seq)| {
            b.best_score
                .cmp(&a.best_score)
                .then(b.last_played.cmp(&a.last_played))
                .then(b_seq.cmp(a_seq))
        });
        rows.truncate(query.effective_limit());
        rows.into_iter().map(|(row, _)| row).collect()
    }
}

#[async_trait]
impl OutcomeSink for MemoryOutcomeSink {
    async fn record(&self, outcome: &Outcome) -> Result<(), SinkError> {
        let mut records = self.records.lock().await;
        let seq = records.len() as u64;
        records.push(RecordedOutcome {
            outcome: outcome.clone(),
            recorded_at: Utc::now(),
            seq,
        });
        Ok(())
    }
}

/// SQL `LIKE` match, case-sensitive, no escape character.
fn like(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Position of the last `%` and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('%') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '_' || c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    pi = star + 1;
                    ti = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str) -> RoomName {
        RoomName::new(name)
    }

    #[test]
    fn test_like_patterns() {
        assert!(like("%", ""));
        assert!(like("%", "anything"));
        assert!(like("r1", "r1"));
        assert!(!like("r1", "r10"));
        assert!(like("r%", "r10"));
        assert!(like("r_", "r1"));
        assert!(!like("r_", "r10"));
        assert!(like("%lobby%", "big-lobby-2"));
        assert!(like("a%b%c", "aXXbYYc"));
        assert!(!like("a%b%c", "aXXcYYb"));
        assert!(!like("", "x"));
    }

    #[test]
    fn test_query_limit_clamping() {
        let q = |limit| LeaderboardQuery {
            room_pattern: None,
            limit,
        };
        assert_eq!(q(None).effective_limit(), 10);
        assert_eq!(q(Some(0)).effective_limit(), 10);
        assert_eq!(q(Some(101)).effective_limit(), 10);
        assert_eq!(q(Some(1)).effective_limit(), 1);
        assert_eq!(q(Some(100)).effective_limit(), 100);
    }

    #[test]
    fn test_outcome_result_display() {
        assert_eq!(OutcomeResult::Win.to_string(), "win");
        assert_eq!(OutcomeResult::Lose.to_string(), "lose");
        assert_eq!(OutcomeResult::Score(7).to_string(), "7");
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_order() {
        let sink = MemoryOutcomeSink::new();
        let r1 = room("r1");
        sink.record(&Outcome::win(PlayerId(1), &r1)).await.unwrap();
        sink.record(&Outcome::lose(PlayerId(2), &r1)).await.unwrap();

        let outcomes = sink.outcomes().await;
        assert_eq!(
            outcomes,
            vec![Outcome::win(PlayerId(1), &r1), Outcome::lose(PlayerId(2), &r1)]
        );
        let records = sink.records().await;
        assert_eq!(records[0].seq, 0);
        assert_eq!(records[1].seq, 1);
    }

    #[tokio::test]
    async fn test_leaderboard_groups_and_orders() {
        let sink = MemoryOutcomeSink::new();
        let (a, b) = (room("snake-a"), room("snake-b"));
        for outcome in [
            Outcome::score(PlayerId(1), &a, 3),
            Outcome::score(PlayerId(1), &a, 9),
            Outcome::score(PlayerId(2), &a, 5),
            Outcome::score(PlayerId(1), &b, 5),
            Outcome::win(PlayerId(3), &a),
        ] {
            sink.record(&outcome).await.unwrap();
        }

        let rows = sink.leaderboard(&LeaderboardQuery::default()).await;
        assert_eq!(rows.len(), 3, "win records are not ranked");

        assert_eq!((rows[0].player, rows[0].best_score), (PlayerId(1), 9));
        assert_eq!(rows[0].games_played, 2);
        // Equal best scores: the more recent play ranks first.
        assert_eq!((rows[1].player, &rows[1].room), (PlayerId(1), &b));
        assert_eq!((rows[2].player, &rows[2].room), (PlayerId(2), &a));
    }

    #[tokio::test]
    async fn test_leaderboard_filters_and_limits() {
        let sink = MemoryOutcomeSink::new();
        for (i, name) in ["r1", "r2", "lobby"].iter().enumerate() {
            sink.record(&Outcome::score(PlayerId(i as u64 + 1), &room(name), 1))
                .await
                .unwrap();
        }

        let rows = sink
            .leaderboard(&LeaderboardQuery {
                room_pattern: Some("r_".into()),
                limit: None,
            })
            .await;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.room.as_str().starts_with('r')));

        let rows = sink
            .leaderboard(&LeaderboardQuery {
                room_pattern: None,
                limit: Some(1),
            })
            .await;
        assert_eq!(rows.len(), 1);
    }
}
