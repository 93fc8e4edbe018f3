// src/models/board.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque player identity. The engine never owns profile data; usernames and
/// avatars come from the external player directory at query time.
///
/// `Ord` is lexicographic and is what makes equal-score ranks deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Time window kinds for rotating boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindowKind {
    Daily,
    Weekly,
    Monthly,
}

impl TimeWindowKind {
    pub fn as_str(&self) -> &str {
        match self {
            TimeWindowKind::Daily => "daily",
            TimeWindowKind::Weekly => "weekly",
            TimeWindowKind::Monthly => "monthly",
        }
    }
}

impl FromStr for TimeWindowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(TimeWindowKind::Daily),
            "weekly" => Ok(TimeWindowKind::Weekly),
            "monthly" => Ok(TimeWindowKind::Monthly),
            other => Err(format!("unknown time window kind: {}", other)),
        }
    }
}

/// Scope of a ranking instance within a board family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardScope {
    Global,
    Friends(PlayerId),
    Window { kind: TimeWindowKind, period: String },
}

/// Identifies one concrete ranking instance: a family name plus a scope.
///
/// A `Window` scope carries its canonical period key, e.g. `"2024-01-15"`
/// for a daily board or `"2024-W03"` for an ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaderboardId {
    pub base: String,
    pub scope: BoardScope,
}

impl LeaderboardId {
    pub fn global(base: impl Into<String>) -> Self {
        Self { base: base.into(), scope: BoardScope::Global }
    }

    pub fn friends(base: impl Into<String>, player: PlayerId) -> Self {
        Self { base: base.into(), scope: BoardScope::Friends(player) }
    }

    pub fn window(base: impl Into<String>, kind: TimeWindowKind, period: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            scope: BoardScope::Window { kind, period: period.into() },
        }
    }

    pub fn is_window(&self) -> bool {
        matches!(self.scope, BoardScope::Window { .. })
    }

    pub fn window_kind(&self) -> Option<TimeWindowKind> {
        match &self.scope {
            BoardScope::Window { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for LeaderboardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            BoardScope::Global => write!(f, "{}:global", self.base),
            BoardScope::Friends(player) => write!(f, "{}:friends:{}", self.base, player),
            BoardScope::Window { kind, period } => {
                write!(f, "{}:{}:{}", self.base, kind.as_str(), period)
            }
        }
    }
}

/// Score update policy for a board family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdatePolicy {
    /// A lower subsequent score never replaces a higher stored score.
    BestScoreWins,
    /// The latest submission always replaces the stored score.
    LatestScoreWins,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        UpdatePolicy::BestScoreWins
    }
}
