// src/models/score.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::board::{LeaderboardId, PlayerId};
use crate::error::EngineError;

/// One submission event, as validated by the pipeline. Fed to the anti-cheat
/// policy as recent history and appended to the optional persistent score log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player: PlayerId,
    pub score: i64,
    pub submitted_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

/// The stored ranking state for one player on one board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub player: PlayerId,
    pub best_score: i64,
    pub last_updated: DateTime<Utc>,
}

/// One row of an ordered board listing. Ranks are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub rank: u64,
    pub player: PlayerId,
    pub score: i64,
}

/// Outcome of a single `upsert` against one board.
///
/// A best-score-wins no-op reports `changed: false` with the player's
/// current rank and stored score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankChange {
    pub changed: bool,
    pub old_rank: Option<u64>,
    pub new_rank: Option<u64>,
    pub score: i64,
}

/// Per-target outcome of a fan-out commit. Targets are independent; one
/// board's failure never rolls back another's success.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardCommit {
    pub board: LeaderboardId,
    pub result: Result<RankChange, EngineError>,
}

/// Result of one accepted submission across all resolved target boards.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub accepted: bool,
    pub per_board: Vec<BoardCommit>,
    pub anti_cheat_flag: Option<String>,
}

impl SubmissionResult {
    /// Targets whose ranking actually changed.
    pub fn changed_boards(&self) -> Vec<&BoardCommit> {
        self.per_board
            .iter()
            .filter(|commit| matches!(&commit.result, Ok(change) if change.changed))
            .collect()
    }

    /// The `PartialCommitFailure` view: some targets failed while others
    /// committed. `None` when everything succeeded or everything failed.
    pub fn partial_failure(&self) -> Option<EngineError> {
        let failed = self.per_board.iter().filter(|c| c.result.is_err()).count();
        if failed > 0 && failed < self.per_board.len() {
            Some(EngineError::PartialCommitFailure { failed, total: self.per_board.len() })
        } else {
            None
        }
    }
}

/// Emitted to the update sink whenever a commit moves a player's rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankChangeEvent {
    pub id: Uuid,
    pub board: LeaderboardId,
    pub player: PlayerId,
    pub old_rank: Option<u64>,
    pub new_rank: u64,
    pub score: i64,
    pub occurred_at: DateTime<Utc>,
}
