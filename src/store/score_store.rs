// src/store/score_store.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::tree::{EntryKey, RankTree};
use crate::error::EngineError;
use crate::models::{PlayerId, RankChange, RankedEntry, ScoreRow, UpdatePolicy};

/// Ordered ranking state for a single leaderboard: an order-statistics tree
/// over (score DESC, player ASC) plus a player index for O(log n) rank
/// lookups by id.
///
/// Each store is its own lock domain. Writers are mutually exclusive,
/// readers run concurrently and always observe a consistent ordering; a hot
/// daily board never serializes access to unrelated boards.
#[derive(Debug)]
pub struct ScoreStore {
    policy: UpdatePolicy,
    max_score: i64,
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    tree: RankTree,
    players: HashMap<PlayerId, RankedEntry>,
}

impl ScoreStore {
    pub fn new(policy: UpdatePolicy, max_score: i64) -> Self {
        Self { policy, max_score, inner: RwLock::new(StoreInner::default()) }
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    /// Insert or reposition a player's entry.
    ///
    /// Under `BestScoreWins` a submission at or below the stored score is a
    /// no-op reporting the current rank. The range check is defensive; the
    /// submission pipeline validates before calling.
    pub async fn upsert(
        &self,
        player: &PlayerId,
        score: i64,
        at: DateTime<Utc>,
    ) -> Result<RankChange, EngineError> {
        if score < 0 || score > self.max_score {
            return Err(EngineError::InvalidScore(format!(
                "score {} outside [0, {}]",
                score, self.max_score
            )));
        }

        let mut inner = self.inner.write().await;
        let existing = inner.players.get(player).cloned();
        match existing {
            Some(current) => {
                let old_key = EntryKey { score: current.best_score, player: player.clone() };
                let old_rank = inner.tree.rank_of(&old_key);
                if self.policy == UpdatePolicy::BestScoreWins && current.best_score >= score {
                    return Ok(RankChange {
                        changed: false,
                        old_rank,
                        new_rank: old_rank,
                        score: current.best_score,
                    });
                }

                inner.tree.remove(&old_key);
                let new_key = EntryKey { score, player: player.clone() };
                inner.tree.insert(new_key.clone());
                inner.players.insert(
                    player.clone(),
                    RankedEntry { player: player.clone(), best_score: score, last_updated: at },
                );
                let new_rank = inner.tree.rank_of(&new_key);
                let changed = score != current.best_score || new_rank != old_rank;
                Ok(RankChange { changed, old_rank, new_rank, score })
            }
            None => {
                let key = EntryKey { score, player: player.clone() };
                inner.tree.insert(key.clone());
                inner.players.insert(
                    player.clone(),
                    RankedEntry { player: player.clone(), best_score: score, last_updated: at },
                );
                let new_rank = inner.tree.rank_of(&key);
                Ok(RankChange { changed: true, old_rank: None, new_rank, score })
            }
        }
    }

    /// 1-based rank and stored score, or `None` for absent players.
    pub async fn rank_of(&self, player: &PlayerId) -> Option<(u64, i64)> {
        let inner = self.inner.read().await;
        let entry = inner.players.get(player)?;
        let key = EntryKey { score: entry.best_score, player: player.clone() };
        inner.tree.rank_of(&key).map(|rank| (rank, entry.best_score))
    }

    pub async fn top_n(&self, n: usize) -> Vec<ScoreRow> {
        self.page(0, n).await
    }

    /// Entries ranked `max(1, rank - radius) ..= rank + radius`, in order.
    pub async fn range_around_rank(&self, rank: u64, radius: u64) -> Vec<ScoreRow> {
        let start = rank.saturating_sub(radius).max(1);
        let end = rank.saturating_add(radius);
        let limit = (end - start + 1) as usize;
        self.page((start - 1) as usize, limit).await
    }

    pub async fn page(&self, offset: usize, limit: usize) -> Vec<ScoreRow> {
        let inner = self.inner.read().await;
        inner
            .tree
            .range(offset, limit)
            .into_iter()
            .enumerate()
            .map(|(i, key)| ScoreRow {
                rank: (offset + i + 1) as u64,
                player: key.player.clone(),
                score: key.score,
            })
            .collect()
    }

    pub async fn remove(&self, player: &PlayerId) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.players.remove(player) else {
            return false;
        };
        inner.tree.remove(&EntryKey { score: entry.best_score, player: player.clone() })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tree.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tree.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MAX: i64 = 1_000_000;

    fn store() -> ScoreStore {
        ScoreStore::new(UpdatePolicy::BestScoreWins, MAX)
    }

    fn row(rank: u64, player: &str, score: i64) -> ScoreRow {
        ScoreRow { rank, player: PlayerId::from(player), score }
    }

    #[tokio::test]
    async fn test_two_player_ordering() {
        let store = store();
        let now = Utc::now();
        store.upsert(&PlayerId::from("A"), 100, now).await.unwrap();
        store.upsert(&PlayerId::from("B"), 200, now).await.unwrap();

        assert_eq!(store.top_n(2).await, vec![row(1, "B", 200), row(2, "A", 100)]);
    }

    #[tokio::test]
    async fn test_best_score_wins_is_idempotent_for_lower_scores() {
        let store = store();
        let now = Utc::now();
        store.upsert(&PlayerId::from("A"), 100, now).await.unwrap();
        let change = store.upsert(&PlayerId::from("A"), 50, now).await.unwrap();

        assert!(!change.changed);
        assert_eq!(change.score, 100);
        assert_eq!(change.old_rank, Some(1));
        assert_eq!(change.new_rank, Some(1));
        assert_eq!(store.rank_of(&PlayerId::from("A")).await, Some((1, 100)));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_latest_score_wins_replaces_unconditionally() {
        let store = ScoreStore::new(UpdatePolicy::LatestScoreWins, MAX);
        let now = Utc::now();
        store.upsert(&PlayerId::from("A"), 100, now).await.unwrap();
        store.upsert(&PlayerId::from("B"), 80, now).await.unwrap();

        let change = store.upsert(&PlayerId::from("A"), 50, now).await.unwrap();
        assert!(change.changed);
        assert_eq!(change.old_rank, Some(1));
        assert_eq!(change.new_rank, Some(2));
        assert_eq!(store.rank_of(&PlayerId::from("A")).await, Some((2, 50)));
    }

    #[tokio::test]
    async fn test_upsert_reports_rank_movement() {
        let store = store();
        let now = Utc::now();
        for (player, score) in [("a", 500), ("b", 400), ("c", 300)] {
            store.upsert(&PlayerId::from(player), score, now).await.unwrap();
        }

        let change = store.upsert(&PlayerId::from("c"), 450, now).await.unwrap();
        assert!(change.changed);
        assert_eq!(change.old_rank, Some(3));
        assert_eq!(change.new_rank, Some(2));
    }

    #[tokio::test]
    async fn test_equal_scores_tie_break_on_player_id() {
        let store = store();
        let now = Utc::now();
        store.upsert(&PlayerId::from("zoe"), 100, now).await.unwrap();
        store.upsert(&PlayerId::from("amy"), 100, now).await.unwrap();

        assert_eq!(store.top_n(2).await, vec![row(1, "amy", 100), row(2, "zoe", 100)]);
    }

    #[tokio::test]
    async fn test_uniqueness_invariant() {
        let store = store();
        let now = Utc::now();
        for score in [10, 70, 30, 70, 50] {
            store.upsert(&PlayerId::from("only"), score, now).await.unwrap();
        }
        assert_eq!(store.len().await, 1);
        assert_eq!(store.rank_of(&PlayerId::from("only")).await, Some((1, 70)));
    }

    #[tokio::test]
    async fn test_rank_topn_round_trip() {
        let store = store();
        let now = Utc::now();
        for i in 1..=10i64 {
            store.upsert(&PlayerId::from(format!("p{:02}", i).as_str()), i * 10, now).await.unwrap();
        }

        let (rank, score) = store.rank_of(&PlayerId::from("p04")).await.unwrap();
        let top = store.top_n(rank as usize).await;
        assert_eq!(top.len(), rank as usize);
        let last = top.last().unwrap();
        assert_eq!(last.player, PlayerId::from("p04"));
        assert_eq!(last.score, score);
    }

    #[tokio::test]
    async fn test_range_around_rank_clamps_at_head() {
        let store = store();
        let now = Utc::now();
        for i in 1..=10i64 {
            store.upsert(&PlayerId::from(format!("p{:02}", i).as_str()), 1000 - i, now).await.unwrap();
        }

        // Player ranked 5th with radius 2 sees ranks 3..=7.
        let around = store.range_around_rank(5, 2).await;
        let ranks: Vec<u64> = around.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![3, 4, 5, 6, 7]);

        // Near the head the window clamps to rank 1.
        let around = store.range_around_rank(1, 2).await;
        let ranks: Vec<u64> = around.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let store = store();
        let now = Utc::now();
        for i in 1..=5i64 {
            store.upsert(&PlayerId::from(format!("p{}", i).as_str()), i, now).await.unwrap();
        }
        assert!(store.page(5, 10).await.is_empty());
        assert_eq!(store.page(3, 10).await.len(), 2);
    }

    #[tokio::test]
    async fn test_store_rejects_out_of_range_scores() {
        let store = store();
        let now = Utc::now();
        let err = store.upsert(&PlayerId::from("A"), -1, now).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_score");
        let err = store.upsert(&PlayerId::from("A"), MAX + 1, now).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_score");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        let now = Utc::now();
        store.upsert(&PlayerId::from("A"), 100, now).await.unwrap();
        assert!(store.remove(&PlayerId::from("A")).await);
        assert!(!store.remove(&PlayerId::from("A")).await);
        assert!(store.is_empty().await);
    }
}
