// src/services/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{BoardScope, LeaderboardId, TimeWindowKind};
use crate::services::rotation;
use crate::store::ScoreStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardState {
    Active,
    Expired,
}

struct BoardRecord {
    store: Arc<ScoreStore>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    state: BoardState,
}

/// Owns every ScoreStore instance, keyed by LeaderboardId.
///
/// Creation is idempotent: concurrent first access to the same id always
/// resolves to the same store (double-checked under the map's write lock).
/// Expiry only marks a record; removal is deferred to the rotator's sweep so
/// in-flight reads never race a teardown.
pub struct LeaderboardRegistry {
    config: Arc<EngineConfig>,
    boards: RwLock<HashMap<LeaderboardId, BoardRecord>>,
}

impl LeaderboardRegistry {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config, boards: RwLock::new(HashMap::new()) }
    }

    /// Look up a board, creating it on first use.
    pub async fn get_or_create(
        &self,
        id: &LeaderboardId,
        now: DateTime<Utc>,
    ) -> Result<Arc<ScoreStore>, EngineError> {
        {
            let boards = self.boards.read().await;
            if let Some(record) = boards.get(id) {
                return Ok(record.store.clone());
            }
        }

        let mut boards = self.boards.write().await;
        if let Some(record) = boards.get(id) {
            // Another submitter won the creation race.
            return Ok(record.store.clone());
        }

        if boards.len() >= self.config.boards.max_boards {
            return Err(EngineError::RegistryUnavailable(format!(
                "board limit of {} reached, cannot provision {}",
                self.config.boards.max_boards, id
            )));
        }

        let expires_at = match &id.scope {
            BoardScope::Window { kind, period } => Some(rotation::period_end(*kind, period)?),
            _ => None,
        };

        let family = self.config.family(&id.base);
        let store = Arc::new(ScoreStore::new(family.update_policy, family.max_score));
        boards.insert(
            id.clone(),
            BoardRecord {
                store: store.clone(),
                created_at: now,
                expires_at,
                state: BoardState::Active,
            },
        );
        info!(board = %id, "leaderboard provisioned");
        Ok(store)
    }

    /// Non-creating lookup for read paths; a query must never spuriously
    /// provision an empty board. Serves expired-but-unpurged boards.
    pub async fn get(&self, id: &LeaderboardId) -> Option<Arc<ScoreStore>> {
        self.boards.read().await.get(id).map(|record| record.store.clone())
    }

    /// Active board ids, optionally restricted to one window kind.
    pub async fn list_active(&self, kind: Option<TimeWindowKind>) -> Vec<LeaderboardId> {
        self.boards
            .read()
            .await
            .iter()
            .filter(|(id, record)| {
                record.state == BoardState::Active
                    && kind.map_or(true, |k| id.window_kind() == Some(k))
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Lifecycle snapshot of every time-windowed board, for the sweep.
    pub async fn window_boards(
        &self,
    ) -> Vec<(LeaderboardId, Option<DateTime<Utc>>, BoardState)> {
        self.boards
            .read()
            .await
            .iter()
            .filter(|(id, _)| id.is_window())
            .map(|(id, record)| (id.clone(), record.expires_at, record.state))
            .collect()
    }

    /// Mark a board Expired. Returns false if absent or already expired.
    pub async fn expire(&self, id: &LeaderboardId) -> bool {
        let mut boards = self.boards.write().await;
        match boards.get_mut(id) {
            Some(record) if record.state == BoardState::Active => {
                record.state = BoardState::Expired;
                true
            }
            _ => false,
        }
    }

    /// Drop a board record entirely. Sweep-only path.
    pub async fn purge(&self, id: &LeaderboardId) -> bool {
        match self.boards.write().await.remove(id) {
            Some(record) => {
                info!(board = %id, created_at = %record.created_at, "leaderboard purged");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.boards.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<LeaderboardRegistry> {
        Arc::new(LeaderboardRegistry::new(Arc::new(EngineConfig::default())))
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let registry = registry();
        let id = LeaderboardId::global("arena");
        let now = Utc::now();

        let first = registry.get_or_create(&id, now).await.unwrap();
        let second = registry.get_or_create(&id, now).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_creates_once() {
        let registry = registry();
        let id = LeaderboardId::window("arena", TimeWindowKind::Daily, "2024-01-15");
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                registry.get_or_create(&id, now).await.unwrap()
            }));
        }

        let mut stores = Vec::new();
        for handle in handles {
            stores.push(handle.await.unwrap());
        }
        assert!(stores.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_does_not_create() {
        let registry = registry();
        let id = LeaderboardId::global("arena");
        assert!(registry.get(&id).await.is_none());
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_board_cap_yields_registry_unavailable() {
        let mut config = EngineConfig::default();
        config.boards.max_boards = 2;
        let registry = LeaderboardRegistry::new(Arc::new(config));
        let now = Utc::now();

        registry.get_or_create(&LeaderboardId::global("a"), now).await.unwrap();
        registry.get_or_create(&LeaderboardId::global("b"), now).await.unwrap();
        let err = registry.get_or_create(&LeaderboardId::global("c"), now).await.unwrap_err();
        assert_eq!(err.kind(), "registry_unavailable");
        assert!(err.is_retryable());

        // Existing boards still resolve at the cap.
        assert!(registry.get_or_create(&LeaderboardId::global("a"), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_window_period_is_rejected() {
        let registry = registry();
        let id = LeaderboardId::window("arena", TimeWindowKind::Daily, "not-a-date");
        let err = registry.get_or_create(&id, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_query");
    }

    #[tokio::test]
    async fn test_expire_keeps_board_queryable_until_purge() {
        let registry = registry();
        let id = LeaderboardId::window("arena", TimeWindowKind::Daily, "2024-01-15");
        let now = Utc::now();
        registry.get_or_create(&id, now).await.unwrap();

        assert!(registry.expire(&id).await);
        assert!(!registry.expire(&id).await);
        assert!(registry.get(&id).await.is_some());
        assert!(registry.list_active(None).await.is_empty());

        assert!(registry.purge(&id).await);
        assert!(registry.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_list_active_filters_by_kind() {
        let registry = registry();
        let now = Utc::now();
        registry.get_or_create(&LeaderboardId::global("arena"), now).await.unwrap();
        registry
            .get_or_create(&LeaderboardId::window("arena", TimeWindowKind::Daily, "2024-01-15"), now)
            .await
            .unwrap();
        registry
            .get_or_create(&LeaderboardId::window("arena", TimeWindowKind::Weekly, "2024-W03"), now)
            .await
            .unwrap();

        assert_eq!(registry.list_active(None).await.len(), 3);
        let daily = registry.list_active(Some(TimeWindowKind::Daily)).await;
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].window_kind(), Some(TimeWindowKind::Daily));
    }
}
