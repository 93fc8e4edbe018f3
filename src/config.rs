// src/config.rs

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

use crate::models::{TimeWindowKind, UpdatePolicy};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub submission: SubmissionConfig,
    pub boards: BoardConfig,
    pub query: QueryConfig,
    pub notifier: NotifierConfig,
    /// Per board-family overrides, keyed by family base name.
    #[serde(default)]
    pub families: HashMap<String, FamilyOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    pub max_score: i64,
    pub rate_limit_per_hour: u32,
    pub anti_cheat_timeout_ms: u64,
    pub anti_cheat_fail_mode: FailMode,
    /// Admitted submissions kept per player as anti-cheat history.
    pub history_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub best_score_wins: bool,
    pub retention_days: i64,
    /// Time windows a Global-scoped submission fans out to.
    pub fan_out_windows: Vec<TimeWindowKind>,
    pub max_boards: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub pagination_max_limit: i64,
    pub directory_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub queue_len: usize,
}

/// Behavior when the anti-cheat collaborator times out or errors.
/// FailClosed rejects the submission; the safer default for competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    Open,
    Closed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyOverride {
    pub max_score: Option<i64>,
    pub best_score_wins: Option<bool>,
}

/// Resolved settings for one board family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySettings {
    pub max_score: i64,
    pub update_policy: UpdatePolicy,
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let fail_mode = match env::var("ANTI_CHEAT_FAIL_MODE")
            .unwrap_or_else(|_| "closed".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "open" => FailMode::Open,
            "closed" => FailMode::Closed,
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "ANTI_CHEAT_FAIL_MODE must be open or closed, got {}",
                    other
                )))
            }
        };

        let fan_out_windows = env::var("FAN_OUT_WINDOWS")
            .unwrap_or_else(|_| "daily,weekly".to_string())
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.parse::<TimeWindowKind>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::InvalidConfig)?;

        Ok(EngineConfig {
            submission: SubmissionConfig {
                max_score: env::var("MAX_SCORE")
                    .unwrap_or_else(|_| "1000000000".to_string())
                    .parse()
                    .unwrap_or(1_000_000_000),
                rate_limit_per_hour: env::var("RATE_LIMIT_PER_HOUR")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .unwrap_or(100),
                anti_cheat_timeout_ms: env::var("ANTI_CHEAT_TIMEOUT_MS")
                    .unwrap_or_else(|_| "250".to_string())
                    .parse()
                    .unwrap_or(250),
                anti_cheat_fail_mode: fail_mode,
                history_len: env::var("HISTORY_LEN")
                    .unwrap_or_else(|_| "16".to_string())
                    .parse()
                    .unwrap_or(16),
            },
            boards: BoardConfig {
                best_score_wins: env::var("BEST_SCORE_WINS")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
                retention_days: env::var("RETENTION_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .unwrap_or(7),
                fan_out_windows,
                max_boards: env::var("MAX_BOARDS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .unwrap_or(10_000),
            },
            query: QueryConfig {
                pagination_max_limit: env::var("PAGINATION_MAX_LIMIT")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
                directory_timeout_ms: env::var("DIRECTORY_TIMEOUT_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .unwrap_or(500),
            },
            notifier: NotifierConfig {
                queue_len: env::var("NOTIFIER_QUEUE_LEN")
                    .unwrap_or_else(|_| "1024".to_string())
                    .parse()
                    .unwrap_or(1024),
            },
            families: HashMap::new(),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound)?;

        toml::from_str(&contents).map_err(|_| ConfigError::ParseError)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.submission.max_score <= 0 {
            return Err(ConfigError::InvalidConfig("Max score must be > 0".to_string()));
        }

        if self.submission.rate_limit_per_hour == 0 {
            return Err(ConfigError::InvalidConfig("Rate limit must be > 0".to_string()));
        }

        if self.query.pagination_max_limit <= 0 {
            return Err(ConfigError::InvalidConfig("Pagination limit must be > 0".to_string()));
        }

        if self.boards.retention_days < 0 {
            return Err(ConfigError::InvalidConfig("Retention days must be >= 0".to_string()));
        }

        if self.boards.max_boards == 0 {
            return Err(ConfigError::InvalidConfig("Max boards must be > 0".to_string()));
        }

        if self.notifier.queue_len == 0 {
            return Err(ConfigError::InvalidConfig("Notifier queue must be > 0".to_string()));
        }

        for (family, overrides) in &self.families {
            if matches!(overrides.max_score, Some(max) if max <= 0) {
                return Err(ConfigError::InvalidConfig(format!(
                    "Max score for family {} must be > 0",
                    family
                )));
            }
        }

        Ok(())
    }

    /// Resolved max-score and update policy for a board family, applying any
    /// per-family override on top of the defaults.
    pub fn family(&self, base: &str) -> FamilySettings {
        let overrides = self.families.get(base);
        let best_wins = overrides
            .and_then(|o| o.best_score_wins)
            .unwrap_or(self.boards.best_score_wins);
        FamilySettings {
            max_score: overrides.and_then(|o| o.max_score).unwrap_or(self.submission.max_score),
            update_policy: if best_wins {
                UpdatePolicy::BestScoreWins
            } else {
                UpdatePolicy::LatestScoreWins
            },
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            submission: SubmissionConfig {
                max_score: 1_000_000_000,
                rate_limit_per_hour: 100,
                anti_cheat_timeout_ms: 250,
                anti_cheat_fail_mode: FailMode::Closed,
                history_len: 16,
            },
            boards: BoardConfig {
                best_score_wins: true,
                retention_days: 7,
                fan_out_windows: vec![TimeWindowKind::Daily, TimeWindowKind::Weekly],
                max_boards: 10_000,
            },
            query: QueryConfig { pagination_max_limit: 500, directory_timeout_ms: 500 },
            notifier: NotifierConfig { queue_len: 1024 },
            families: HashMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    FileNotFound,

    #[error("Failed to parse configuration")]
    ParseError,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.submission.rate_limit_per_hour, 100);
        assert_eq!(config.boards.retention_days, 7);
        assert_eq!(config.submission.anti_cheat_fail_mode, FailMode::Closed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_rate_limit() {
        let mut config = EngineConfig::default();
        config.submission.rate_limit_per_hour = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_family_override_resolution() {
        let mut config = EngineConfig::default();
        config.families.insert(
            "speedrun".to_string(),
            FamilyOverride { max_score: Some(3_600_000), best_score_wins: Some(false) },
        );

        let speedrun = config.family("speedrun");
        assert_eq!(speedrun.max_score, 3_600_000);
        assert_eq!(speedrun.update_policy, UpdatePolicy::LatestScoreWins);

        let arena = config.family("arena");
        assert_eq!(arena.max_score, config.submission.max_score);
        assert_eq!(arena.update_policy, UpdatePolicy::BestScoreWins);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_src = r#"
            [submission]
            max_score = 50000
            rate_limit_per_hour = 5
            anti_cheat_timeout_ms = 100
            anti_cheat_fail_mode = "open"
            history_len = 8

            [boards]
            best_score_wins = true
            retention_days = 3
            fan_out_windows = ["daily"]
            max_boards = 64

            [query]
            pagination_max_limit = 100
            directory_timeout_ms = 250

            [notifier]
            queue_len = 32

            [families.speedrun]
            best_score_wins = false
        "#;

        let config: EngineConfig = toml::from_str(toml_src).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.submission.max_score, 50_000);
        assert_eq!(config.submission.anti_cheat_fail_mode, FailMode::Open);
        assert_eq!(config.boards.fan_out_windows, vec![TimeWindowKind::Daily]);
        assert_eq!(config.family("speedrun").update_policy, UpdatePolicy::LatestScoreWins);
    }
}
