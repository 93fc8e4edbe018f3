// src/models/view.rs

use serde::{Deserialize, Serialize};

use super::board::{LeaderboardId, PlayerId};

/// Player profile as served by the external directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    pub username: String,
    pub avatar_url: Option<String>,
}

/// One leaderboard row composed with directory data. `profile` is `None`
/// when the directory does not know the player or the lookup degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntryView {
    pub rank: u64,
    pub player: PlayerId,
    pub score: i64,
    pub profile: Option<ProfileView>,
}

/// A single player's position on one board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankView {
    pub board: LeaderboardId,
    pub player: PlayerId,
    pub rank: u64,
    pub score: i64,
}

/// One page of an ordered board listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult {
    pub entries: Vec<LeaderboardEntryView>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}
