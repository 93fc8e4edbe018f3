// src/services/query.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{
    LeaderboardEntryView, LeaderboardId, PagedResult, PlayerId, ProfileView, RankView, ScoreRow,
};
use crate::services::registry::LeaderboardRegistry;

/// External source of player profile data. Unknown players are omitted from
/// the returned map, never an error for the whole batch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    async fn batch_profiles(
        &self,
        players: Vec<PlayerId>,
    ) -> anyhow::Result<HashMap<PlayerId, ProfileView>>;
}

/// Directory that knows nobody; every view carries `profile: None`.
pub struct EmptyDirectory;

#[async_trait]
impl PlayerDirectory for EmptyDirectory {
    async fn batch_profiles(
        &self,
        _players: Vec<PlayerId>,
    ) -> anyhow::Result<HashMap<PlayerId, ProfileView>> {
        Ok(HashMap::new())
    }
}

/// Serves read queries, composing store rows with directory profiles.
///
/// Queries against a missing board return empty results; a board nobody has
/// submitted to yet is a valid, empty state, not an error.
pub struct RankQueryService {
    config: Arc<EngineConfig>,
    registry: Arc<LeaderboardRegistry>,
    directory: Arc<dyn PlayerDirectory>,
}

impl RankQueryService {
    pub fn new(
        config: Arc<EngineConfig>,
        registry: Arc<LeaderboardRegistry>,
        directory: Arc<dyn PlayerDirectory>,
    ) -> Self {
        Self { config, registry, directory }
    }

    pub async fn top_n(
        &self,
        board: &LeaderboardId,
        n: i64,
    ) -> Result<Vec<LeaderboardEntryView>, EngineError> {
        if n <= 0 {
            return Err(EngineError::InvalidQuery("top-n count must be positive".to_string()));
        }
        let n = n.min(self.config.query.pagination_max_limit) as usize;

        let Some(store) = self.registry.get(board).await else {
            return Ok(Vec::new());
        };
        let rows = store.top_n(n).await;
        Ok(self.compose(rows).await)
    }

    pub async fn player_rank(
        &self,
        board: &LeaderboardId,
        player: &PlayerId,
    ) -> Result<Option<RankView>, EngineError> {
        let Some(store) = self.registry.get(board).await else {
            return Ok(None);
        };
        Ok(store.rank_of(player).await.map(|(rank, score)| RankView {
            board: board.clone(),
            player: player.clone(),
            rank,
            score,
        }))
    }

    /// Entries surrounding a player's own rank; empty when the player has no
    /// entry on the board.
    pub async fn players_around(
        &self,
        board: &LeaderboardId,
        player: &PlayerId,
        radius: i64,
    ) -> Result<Vec<LeaderboardEntryView>, EngineError> {
        if radius < 0 {
            return Err(EngineError::InvalidQuery("radius must be >= 0".to_string()));
        }
        let Some(store) = self.registry.get(board).await else {
            return Ok(Vec::new());
        };
        let Some((rank, _)) = store.rank_of(player).await else {
            return Ok(Vec::new());
        };
        let rows = store.range_around_rank(rank, radius as u64).await;
        Ok(self.compose(rows).await)
    }

    pub async fn page(
        &self,
        board: &LeaderboardId,
        offset: i64,
        limit: i64,
    ) -> Result<PagedResult, EngineError> {
        if offset < 0 {
            return Err(EngineError::InvalidQuery("offset must be >= 0".to_string()));
        }
        if limit <= 0 {
            return Err(EngineError::InvalidQuery("limit must be positive".to_string()));
        }
        let limit = limit.min(self.config.query.pagination_max_limit);

        let Some(store) = self.registry.get(board).await else {
            return Ok(PagedResult {
                entries: Vec::new(),
                total: 0,
                offset: offset as u64,
                limit: limit as u64,
            });
        };

        let total = store.len().await as u64;
        let rows = store.page(offset as usize, limit as usize).await;
        Ok(PagedResult {
            entries: self.compose(rows).await,
            total,
            offset: offset as u64,
            limit: limit as u64,
        })
    }

    /// Attach directory profiles, preserving rank order. Directory failures
    /// and timeouts degrade to profile-less views instead of failing the
    /// query.
    async fn compose(&self, rows: Vec<ScoreRow>) -> Vec<LeaderboardEntryView> {
        if rows.is_empty() {
            return Vec::new();
        }

        let players: Vec<PlayerId> = rows.iter().map(|row| row.player.clone()).collect();
        let timeout = Duration::from_millis(self.config.query.directory_timeout_ms);
        let profiles =
            match tokio::time::timeout(timeout, self.directory.batch_profiles(players)).await {
                Ok(Ok(profiles)) => profiles,
                Ok(Err(err)) => {
                    warn!(error = %err, "player directory lookup failed, serving without profiles");
                    HashMap::new()
                }
                Err(_) => {
                    warn!("player directory lookup timed out, serving without profiles");
                    HashMap::new()
                }
            };

        rows.into_iter()
            .map(|row| LeaderboardEntryView {
                rank: row.rank,
                profile: profiles.get(&row.player).cloned(),
                player: row.player,
                score: row.score,
            })
            .collect()
    }
}
