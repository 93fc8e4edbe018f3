//! Real-time ranked leaderboard engine.
//!
//! An in-memory ranking core built around per-board sorted-set stores:
//! score submissions flow through validation, a pluggable anti-cheat policy,
//! and rate limiting, then fan out to the global board plus the current
//! time-windowed boards. Rank, top-N, around-rank, and paginated queries are
//! composed with externally-sourced player profiles, and every rank movement
//! is pushed to an injected update sink.
//!
//! Persistence, transport, and HTTP routing live outside this crate and are
//! consumed through the trait seams in [`services`].

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
pub mod store;

pub use config::{EngineConfig, FailMode};
pub use engine::{Collaborators, LeaderboardEngine};
pub use error::{EngineError, EngineResult};
pub use models::{
    BoardScope, LeaderboardEntryView, LeaderboardId, PagedResult, PlayerId, ProfileView,
    RankChange, RankChangeEvent, RankView, ScoreEntry, SubmissionResult, TimeWindowKind,
    UpdatePolicy,
};
pub use services::{
    AcceptAllPolicy, AntiCheatPolicy, EmptyDirectory, NoopSink, PersistentScoreLog,
    PlayerDirectory, UpdateSink, Verdict,
};
pub use store::ScoreStore;
