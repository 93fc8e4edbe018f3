// src/services/rate_limit.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::error::EngineError;
use crate::models::{LeaderboardId, PlayerId};

struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Rolling-window submission counter per (player, requested board).
///
/// A fan-out submission consumes one unit against the board it was addressed
/// to, not one per resolved target. Stale windows are reclaimed by `prune`,
/// called from the rotation sweep, so counter state stays bounded.
pub struct SubmissionRateLimiter {
    max_per_window: u32,
    window: Duration,
    counters: Mutex<HashMap<(PlayerId, LeaderboardId), Window>>,
}

impl SubmissionRateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self { max_per_window, window, counters: Mutex::new(HashMap::new()) }
    }

    pub fn hourly(max_per_hour: u32) -> Self {
        Self::new(max_per_hour, Duration::hours(1))
    }

    /// Admit or reject one submission at `now`. Admission increments the
    /// window counter; rejection carries a retry-after hint.
    pub async fn check(
        &self,
        player: &PlayerId,
        board: &LeaderboardId,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut counters = self.counters.lock().await;
        let window = counters
            .entry((player.clone(), board.clone()))
            .or_insert(Window { started_at: now, count: 0 });

        if now - window.started_at >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.max_per_window {
            let retry_after_secs =
                (window.started_at + self.window - now).num_seconds().max(1);
            return Err(EngineError::RateLimited { retry_after_secs });
        }

        window.count += 1;
        Ok(())
    }

    /// Drop every counter whose window has fully elapsed.
    pub async fn prune(&self, now: DateTime<Utc>) {
        self.counters
            .lock()
            .await
            .retain(|_, window| now - window.started_at < self.window);
    }

    pub async fn tracked_keys(&self) -> usize {
        self.counters.lock().await.len()
    }
}
