// src/services/rotation.rs

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::models::TimeWindowKind;
use crate::services::rate_limit::SubmissionRateLimiter;
use crate::services::registry::{BoardState, LeaderboardRegistry};

/// Canonical period key for the window containing `now`, in UTC.
///
/// Daily keys are `YYYY-MM-DD`, monthly keys `YYYY-MM`. Weekly keys follow
/// ISO-8601 week numbering (`YYYY-Www`), so the week containing Jan 1
/// belongs to whichever year owns its Thursday.
pub fn period_key(kind: TimeWindowKind, now: DateTime<Utc>) -> String {
    match kind {
        TimeWindowKind::Daily => now.format("%Y-%m-%d").to_string(),
        TimeWindowKind::Weekly => {
            let iso = now.iso_week();
            format!("{:04}-W{:02}", iso.year(), iso.week())
        }
        TimeWindowKind::Monthly => now.format("%Y-%m").to_string(),
    }
}

/// The boundary instant at which the window named by `key` ends: midnight
/// UTC after its last day.
pub fn period_end(kind: TimeWindowKind, key: &str) -> Result<DateTime<Utc>, EngineError> {
    let first_day_after = match kind {
        TimeWindowKind::Daily => NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .ok()
            .map(|date| date + Duration::days(1)),
        TimeWindowKind::Weekly => parse_iso_week(key).map(|monday| monday + Duration::weeks(1)),
        TimeWindowKind::Monthly => NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")
            .ok()
            .and_then(|date| {
                if date.month() == 12 {
                    NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
                }
            }),
    };

    first_day_after
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| {
            EngineError::InvalidQuery(format!("malformed {} period key: {}", kind.as_str(), key))
        })
}

/// Monday of the ISO week named `YYYY-Www`.
fn parse_iso_week(key: &str) -> Option<NaiveDate> {
    let (year, week) = key.split_once("-W")?;
    let year: i32 = year.parse().ok()?;
    let week: u32 = week.parse().ok()?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub expired: usize,
    pub purged: usize,
}

/// Advances time-windowed boards through Active -> Expired -> Purged.
///
/// Driven by an external scheduler calling `sweep`; the engine owns no timer
/// thread. Expired-but-unpurged boards stay queryable so "yesterday's
/// leaderboard" views keep working until retention elapses.
pub struct TimeWindowRotator {
    registry: Arc<LeaderboardRegistry>,
    limiter: Arc<SubmissionRateLimiter>,
    retention: Duration,
}

impl TimeWindowRotator {
    pub fn new(
        registry: Arc<LeaderboardRegistry>,
        limiter: Arc<SubmissionRateLimiter>,
        retention_days: i64,
    ) -> Self {
        Self { registry, limiter, retention: Duration::days(retention_days) }
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepStats {
        let mut stats = SweepStats::default();

        for (id, expires_at, state) in self.registry.window_boards().await {
            let Some(expires_at) = expires_at else { continue };
            match state {
                BoardState::Active => {
                    if now >= expires_at && self.registry.expire(&id).await {
                        info!(board = %id, "leaderboard window expired");
                        stats.expired += 1;
                    }
                }
                BoardState::Expired => {
                    if now >= expires_at + self.retention && self.registry.purge(&id).await {
                        info!(board = %id, "leaderboard window purged");
                        stats.purged += 1;
                    }
                }
            }
        }

        self.limiter.prune(now).await;
        debug!(expired = stats.expired, purged = stats.purged, "rotation sweep complete");
        stats
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_daily_period_key_and_end() {
        let now = at(2024, 1, 15, 23);
        assert_eq!(period_key(TimeWindowKind::Daily, now), "2024-01-15");
        assert_eq!(period_end(TimeWindowKind::Daily, "2024-01-15").unwrap(), at(2024, 1, 16, 0));
    }

    #[test]
    fn test_weekly_period_key_uses_iso_weeks() {
        // 2024-01-15 is a Monday in ISO week 3.
        assert_eq!(period_key(TimeWindowKind::Weekly, at(2024, 1, 15, 12)), "2024-W03");
        // Dec 30, 2024 belongs to ISO week 1 of 2025.
        assert_eq!(period_key(TimeWindowKind::Weekly, at(2024, 12, 30, 12)), "2025-W01");
        // Jan 1, 2021 belongs to ISO week 53 of 2020.
        assert_eq!(period_key(TimeWindowKind::Weekly, at(2021, 1, 1, 12)), "2020-W53");
    }

    #[test]
    fn test_weekly_period_end() {
        // ISO week 3 of 2024 runs Mon Jan 15 .. Sun Jan 21.
        assert_eq!(period_end(TimeWindowKind::Weekly, "2024-W03").unwrap(), at(2024, 1, 22, 0));
    }

    #[test]
    fn test_monthly_period_end_handles_year_rollover() {
        assert_eq!(period_key(TimeWindowKind::Monthly, at(2024, 12, 31, 12)), "2024-12");
        assert_eq!(period_end(TimeWindowKind::Monthly, "2024-12").unwrap(), at(2025, 1, 1, 0));
        assert_eq!(period_end(TimeWindowKind::Monthly, "2024-02").unwrap(), at(2024, 3, 1, 0));
    }

    #[test]
    fn test_malformed_period_keys_are_rejected() {
        assert!(period_end(TimeWindowKind::Daily, "yesterday").is_err());
        assert!(period_end(TimeWindowKind::Weekly, "2024-03").is_err());
        assert!(period_end(TimeWindowKind::Weekly, "2024-W99").is_err());
        assert!(period_end(TimeWindowKind::Monthly, "2024-13").is_err());
    }

    #[tokio::test]
    async fn test_sweep_walks_boards_through_their_lifecycle() {
        use crate::config::EngineConfig;
        use crate::models::LeaderboardId;

        let mut config = EngineConfig::default();
        config.boards.retention_days = 7;
        let registry = Arc::new(LeaderboardRegistry::new(Arc::new(config)));
        let limiter = Arc::new(SubmissionRateLimiter::hourly(100));
        let rotator = TimeWindowRotator::new(registry.clone(), limiter, 7);

        let daily = LeaderboardId::window("arena", TimeWindowKind::Daily, "2024-01-15");
        let global = LeaderboardId::global("arena");
        let created = at(2024, 1, 15, 8);
        registry.get_or_create(&daily, created).await.unwrap();
        registry.get_or_create(&global, created).await.unwrap();

        // Mid-window: nothing moves.
        let stats = rotator.sweep(at(2024, 1, 15, 23)).await;
        assert_eq!(stats, SweepStats::default());

        // Past the boundary the window expires but stays queryable.
        let stats = rotator.sweep(at(2024, 1, 16, 0)).await;
        assert_eq!(stats, SweepStats { expired: 1, purged: 0 });
        assert!(registry.get(&daily).await.is_some());

        // Re-sweeping inside retention changes nothing.
        let stats = rotator.sweep(at(2024, 1, 20, 0)).await;
        assert_eq!(stats, SweepStats::default());

        // Retention elapses: the window is purged, the global board stays.
        let stats = rotator.sweep(at(2024, 1, 23, 0)).await;
        assert_eq!(stats, SweepStats { expired: 0, purged: 1 });
        assert!(registry.get(&daily).await.is_none());
        assert!(registry.get(&global).await.is_some());
    }
}
