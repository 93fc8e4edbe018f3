// src/services/mod.rs

pub mod notifier;
pub mod query;
pub mod rate_limit;
pub mod registry;
pub mod rotation;
pub mod submission;

pub use notifier::{NoopSink, UpdateNotifier, UpdateSink};
pub use query::{EmptyDirectory, PlayerDirectory, RankQueryService};
pub use rate_limit::SubmissionRateLimiter;
pub use registry::LeaderboardRegistry;
pub use rotation::TimeWindowRotator;
pub use submission::{AcceptAllPolicy, AntiCheatPolicy, PersistentScoreLog, ScoreSubmissionPipeline, Verdict};
