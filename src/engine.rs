// src/engine.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{ConfigError, EngineConfig};
use crate::error::EngineError;
use crate::models::{
    LeaderboardEntryView, LeaderboardId, PagedResult, PlayerId, RankView, SubmissionResult,
    TimeWindowKind,
};
use crate::services::notifier::{UpdateNotifier, UpdateSink};
use crate::services::query::{PlayerDirectory, RankQueryService};
use crate::services::rate_limit::SubmissionRateLimiter;
use crate::services::registry::LeaderboardRegistry;
use crate::services::rotation::{SweepStats, TimeWindowRotator};
use crate::services::submission::{AntiCheatPolicy, PersistentScoreLog, ScoreSubmissionPipeline};

/// External collaborators the engine is wired to at construction.
pub struct Collaborators {
    pub anti_cheat: Arc<dyn AntiCheatPolicy>,
    pub directory: Arc<dyn PlayerDirectory>,
    pub update_sink: Arc<dyn UpdateSink>,
    pub score_log: Option<Arc<dyn PersistentScoreLog>>,
}

/// The assembled leaderboard engine: registry, submission pipeline, query
/// service, and rotator sharing one configuration.
///
/// The engine owns no timer; an external scheduler drives `sweep`.
pub struct LeaderboardEngine {
    registry: Arc<LeaderboardRegistry>,
    pipeline: ScoreSubmissionPipeline,
    queries: RankQueryService,
    rotator: TimeWindowRotator,
    notifier: Arc<UpdateNotifier>,
}

impl LeaderboardEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = Arc::new(config);

        let registry = Arc::new(LeaderboardRegistry::new(config.clone()));
        let limiter = Arc::new(SubmissionRateLimiter::hourly(
            config.submission.rate_limit_per_hour,
        ));
        let notifier = Arc::new(UpdateNotifier::new(
            collaborators.update_sink,
            config.notifier.queue_len,
        ));

        let pipeline = ScoreSubmissionPipeline::new(
            config.clone(),
            registry.clone(),
            limiter.clone(),
            notifier.clone(),
            collaborators.anti_cheat,
            collaborators.score_log,
        );
        let queries =
            RankQueryService::new(config.clone(), registry.clone(), collaborators.directory);
        let rotator =
            TimeWindowRotator::new(registry.clone(), limiter, config.boards.retention_days);

        Ok(Self { registry, pipeline, queries, rotator, notifier })
    }

    pub async fn submit(
        &self,
        player: PlayerId,
        board: LeaderboardId,
        score: i64,
        metadata: Option<serde_json::Value>,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmissionResult, EngineError> {
        self.pipeline.submit(player, board, score, metadata, submitted_at).await
    }

    pub async fn top_n(
        &self,
        board: &LeaderboardId,
        n: i64,
    ) -> Result<Vec<LeaderboardEntryView>, EngineError> {
        self.queries.top_n(board, n).await
    }

    pub async fn player_rank(
        &self,
        board: &LeaderboardId,
        player: &PlayerId,
    ) -> Result<Option<RankView>, EngineError> {
        self.queries.player_rank(board, player).await
    }

    pub async fn players_around(
        &self,
        board: &LeaderboardId,
        player: &PlayerId,
        radius: i64,
    ) -> Result<Vec<LeaderboardEntryView>, EngineError> {
        self.queries.players_around(board, player, radius).await
    }

    pub async fn page(
        &self,
        board: &LeaderboardId,
        offset: i64,
        limit: i64,
    ) -> Result<PagedResult, EngineError> {
        self.queries.page(board, offset, limit).await
    }

    pub async fn list_active_boards(
        &self,
        kind: Option<TimeWindowKind>,
    ) -> Vec<LeaderboardId> {
        self.registry.list_active(kind).await
    }

    /// One maintenance pass: advance window lifecycles, enforce retention,
    /// and reclaim stale rate-limit and history state.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepStats {
        let stats = self.rotator.sweep(now).await;
        self.pipeline.prune_history(now).await;
        stats
    }

    /// Drain queued rank-change events and stop the forwarder.
    pub async fn shutdown(&self) {
        self.notifier.shutdown().await;
    }
}
