// src/services/submission.rs

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, FailMode};
use crate::error::EngineError;
use crate::models::{
    BoardCommit, BoardScope, LeaderboardId, PlayerId, RankChangeEvent, ScoreEntry,
    SubmissionResult,
};
use crate::services::notifier::UpdateNotifier;
use crate::services::rate_limit::SubmissionRateLimiter;
use crate::services::registry::LeaderboardRegistry;
use crate::services::rotation;

/// Anti-cheat verdict for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Admitted, but flagged for later review.
    Flag(String),
    Reject(String),
}

/// Pluggable fraud-detection policy. The engine invokes it and honors the
/// verdict; detection heuristics live entirely behind this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AntiCheatPolicy: Send + Sync {
    async fn evaluate(
        &self,
        player: PlayerId,
        score: i64,
        recent_history: Vec<ScoreEntry>,
    ) -> anyhow::Result<Verdict>;
}

/// Policy that admits everything.
pub struct AcceptAllPolicy;

#[async_trait]
impl AntiCheatPolicy for AcceptAllPolicy {
    async fn evaluate(
        &self,
        _player: PlayerId,
        _score: i64,
        _recent_history: Vec<ScoreEntry>,
    ) -> anyhow::Result<Verdict> {
        Ok(Verdict::Accept)
    }
}

/// Optional append-only audit sink for admitted submissions. The in-memory
/// stores stay the source of truth for live ranking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistentScoreLog: Send + Sync {
    async fn append(&self, entry: ScoreEntry) -> anyhow::Result<()>;
}

const HISTORY_MAX_AGE_HOURS: i64 = 24;

/// Validates and admits one score submission end-to-end: range check,
/// anti-cheat verdict, rate limit, fan-out resolution, independent per-board
/// commits, then best-effort notification and audit logging.
pub struct ScoreSubmissionPipeline {
    config: Arc<EngineConfig>,
    registry: Arc<LeaderboardRegistry>,
    limiter: Arc<SubmissionRateLimiter>,
    notifier: Arc<UpdateNotifier>,
    anti_cheat: Arc<dyn AntiCheatPolicy>,
    score_log: Option<Arc<dyn PersistentScoreLog>>,
    history: Mutex<HashMap<PlayerId, VecDeque<ScoreEntry>>>,
}

impl ScoreSubmissionPipeline {
    pub fn new(
        config: Arc<EngineConfig>,
        registry: Arc<LeaderboardRegistry>,
        limiter: Arc<SubmissionRateLimiter>,
        notifier: Arc<UpdateNotifier>,
        anti_cheat: Arc<dyn AntiCheatPolicy>,
        score_log: Option<Arc<dyn PersistentScoreLog>>,
    ) -> Self {
        Self {
            config,
            registry,
            limiter,
            notifier,
            anti_cheat,
            score_log,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Admit one submission. Validation and rate-limit failures are
    /// all-or-nothing; once past validation, each resolved board commits
    /// independently and failures surface per target in the result.
    pub async fn submit(
        &self,
        player: PlayerId,
        board: LeaderboardId,
        raw_score: i64,
        metadata: Option<serde_json::Value>,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmissionResult, EngineError> {
        let family = self.config.family(&board.base);
        if raw_score < 0 || raw_score > family.max_score {
            return Err(EngineError::InvalidScore(format!(
                "score {} outside [0, {}] for {}",
                raw_score, family.max_score, board.base
            )));
        }

        let anti_cheat_flag = match self.evaluate_anti_cheat(&player, raw_score).await? {
            Verdict::Accept => None,
            Verdict::Flag(reason) => {
                warn!(player = %player, board = %board, reason = %reason, "submission flagged");
                Some(reason)
            }
            Verdict::Reject(reason) => return Err(EngineError::AntiCheatRejected(reason)),
        };

        self.limiter.check(&player, &board, submitted_at).await?;

        let entry = ScoreEntry {
            player: player.clone(),
            score: raw_score,
            submitted_at,
            metadata,
        };
        self.record_history(entry.clone()).await;

        let targets = self.resolve_targets(&board, submitted_at);
        let per_board = join_all(targets.into_iter().map(|target| {
            let player = player.clone();
            async move {
                let result = match self.registry.get_or_create(&target, submitted_at).await {
                    Ok(store) => store.upsert(&player, raw_score, submitted_at).await,
                    Err(err) => Err(err),
                };
                if let Err(err) = &result {
                    warn!(board = %target, error = %err, "board commit failed");
                }
                BoardCommit { board: target, result }
            }
        }))
        .await;

        if per_board.iter().any(|commit| commit.result.is_ok()) {
            if let Some(log) = &self.score_log {
                if let Err(err) = log.append(entry).await {
                    warn!(player = %player, error = %err, "score log append failed");
                }
            }
        }

        for commit in &per_board {
            if let Ok(change) = &commit.result {
                if change.changed {
                    if let Some(new_rank) = change.new_rank {
                        self.notifier
                            .notify(RankChangeEvent {
                                id: Uuid::new_v4(),
                                board: commit.board.clone(),
                                player: player.clone(),
                                old_rank: change.old_rank,
                                new_rank,
                                score: change.score,
                                occurred_at: submitted_at,
                            })
                            .await;
                    }
                }
            }
        }

        debug!(
            player = %player,
            board = %board,
            score = raw_score,
            targets = per_board.len(),
            "submission committed"
        );
        Ok(SubmissionResult { accepted: true, per_board, anti_cheat_flag })
    }

    /// Age out recent-history entries. Wired into the rotation sweep.
    pub async fn prune_history(&self, now: DateTime<Utc>) {
        let cutoff = now - Duration::hours(HISTORY_MAX_AGE_HOURS);
        let mut history = self.history.lock().await;
        for entries in history.values_mut() {
            entries.retain(|entry| entry.submitted_at >= cutoff);
        }
        history.retain(|_, entries| !entries.is_empty());
    }

    async fn evaluate_anti_cheat(
        &self,
        player: &PlayerId,
        score: i64,
    ) -> Result<Verdict, EngineError> {
        let recent = self.recent_history(player).await;
        let timeout = StdDuration::from_millis(self.config.submission.anti_cheat_timeout_ms);
        let evaluation = self.anti_cheat.evaluate(player.clone(), score, recent);

        match tokio::time::timeout(timeout, evaluation).await {
            Ok(Ok(verdict)) => Ok(verdict),
            Ok(Err(err)) => self.resolve_unavailable(player, format!("policy error: {}", err)),
            Err(_) => self.resolve_unavailable(
                player,
                format!("policy timed out after {}ms", timeout.as_millis()),
            ),
        }
    }

    /// Apply the configured fail mode when the policy cannot answer.
    fn resolve_unavailable(
        &self,
        player: &PlayerId,
        reason: String,
    ) -> Result<Verdict, EngineError> {
        match self.config.submission.anti_cheat_fail_mode {
            FailMode::Closed => Err(EngineError::AntiCheatUnavailable(reason)),
            FailMode::Open => {
                warn!(player = %player, reason = %reason, "anti-cheat unavailable, admitting (fail-open)");
                Ok(Verdict::Accept)
            }
        }
    }

    /// A Global-scoped submission fans out to the configured time windows
    /// for its instant; Friends- and Window-scoped submissions target only
    /// the requested board.
    fn resolve_targets(&self, board: &LeaderboardId, at: DateTime<Utc>) -> Vec<LeaderboardId> {
        match &board.scope {
            BoardScope::Global => {
                let mut targets = vec![board.clone()];
                for kind in &self.config.boards.fan_out_windows {
                    targets.push(LeaderboardId::window(
                        board.base.clone(),
                        *kind,
                        rotation::period_key(*kind, at),
                    ));
                }
                targets
            }
            _ => vec![board.clone()],
        }
    }

    async fn recent_history(&self, player: &PlayerId) -> Vec<ScoreEntry> {
        self.history
            .lock()
            .await
            .get(player)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn record_history(&self, entry: ScoreEntry) {
        let mut history = self.history.lock().await;
        let entries = history.entry(entry.player.clone()).or_default();
        entries.push_back(entry);
        while entries.len() > self.config.submission.history_len {
            entries.pop_front();
        }
    }
}
