//! Weighted dual-window rate limiter (C4, spec §4.4).
//!
//! Each `(action, userId)` pair tracks a current and previous fixed window.
//! The weighted load blends a decaying fraction of the previous window into
//! the current one, smoothing the hard edge a naive fixed-window counter
//! would otherwise have right at the window boundary.

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::config::RateRule;

#[derive(Debug, Clone, Copy)]
struct WindowState {
    current_count: u32,
    previous_count: u32,
    current_window_start: u64,
    last_touched: u64,
}

pub struct RateLimiter {
    windows: DashMap<(String, String), WindowState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Returns `true` if the request is admitted under `rule`, recording the
    /// hit if so. `now_secs` is injected so tests can drive the clock.
    pub fn check(&self, action: &str, user_id: &str, rule: &RateRule, now_secs: u64) -> bool {
        let window = rule.window_secs.max(1);
        let key = (action.to_string(), user_id.to_string());
        let aligned_start = (now_secs / window) * window;

        let mut entry = self
            .windows
            .entry(key)
            .or_insert_with(|| WindowState {
                current_count: 0,
                previous_count: 0,
                current_window_start: aligned_start,
                last_touched: now_secs,
            });

        if aligned_start != entry.current_window_start {
            let elapsed_windows = (aligned_start - entry.current_window_start) / window;
            if elapsed_windows == 1 {
                entry.previous_count = entry.current_count;
            } else {
                entry.previous_count = 0;
            }
            entry.current_count = 0;
            entry.current_window_start = aligned_start;
        }

        let elapsed_in_window = now_secs.saturating_sub(entry.current_window_start) as f64;
        let decay = (1.0 - elapsed_in_window / window as f64).max(0.0);
        let weighted = entry.current_count as f64 + decay * entry.previous_count as f64;

        entry.last_touched = now_secs;

        if weighted < rule.limit as f64 {
            entry.current_count += 1;
            true
        } else {
            false
        }
    }

    /// Removes entries untouched for `3 * window_secs`, per rule. Intended to
    /// run on a periodic interval from the cleanup service.
    pub fn prune(&self, window_secs: u64, now_secs: u64) {
        let stale_after = window_secs.max(1) * 3;
        self.windows
            .retain(|_, state| now_secs.saturating_sub(state.last_touched) < stale_after);
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(limit: u32, window_secs: u64) -> RateRule {
        RateRule { limit, window_secs }
    }

    #[test]
    fn admits_up_to_limit_within_a_window() {
        let limiter = RateLimiter::new();
        let rule = rule(3, 10);
        assert!(limiter.check("submitAnswer", "u1", &rule, 100));
        assert!(limiter.check("submitAnswer", "u1", &rule, 101));
        assert!(limiter.check("submitAnswer", "u1", &rule, 102));
        assert!(!limiter.check("submitAnswer", "u1", &rule, 103));
    }

    #[test]
    fn separate_users_have_independent_budgets() {
        let limiter = RateLimiter::new();
        let rule = rule(1, 10);
        assert!(limiter.check("createRoom", "u1", &rule, 100));
        assert!(limiter.check("createRoom", "u2", &rule, 100));
    }

    #[test]
    fn weighted_decay_throttles_immediately_after_rollover() {
        let limiter = RateLimiter::new();
        let rule = rule(2, 10);
        assert!(limiter.check("joinRoom", "u1", &rule, 100));
        assert!(limiter.check("joinRoom", "u1", &rule, 101));
        assert!(!limiter.check("joinRoom", "u1", &rule, 102));

        // Into the next window immediately: previous_count carries full weight.
        assert!(!limiter.check("joinRoom", "u1", &rule, 110));
    }

    #[test]
    fn weighted_decay_fades_across_the_window() {
        let limiter = RateLimiter::new();
        let rule = rule(2, 10);
        assert!(limiter.check("joinRoom", "u1", &rule, 100));
        assert!(limiter.check("joinRoom", "u1", &rule, 101));

        // Near the end of the next window the decayed contribution is small.
        assert!(limiter.check("joinRoom", "u1", &rule, 119));
    }

    #[test]
    fn skipped_windows_reset_previous_count() {
        let limiter = RateLimiter::new();
        let rule = rule(1, 10);
        assert!(limiter.check("startGame", "u1", &rule, 100));
        // Three windows later: previous window is irrelevant, budget is fresh.
        assert!(limiter.check("startGame", "u1", &rule, 140));
    }

    #[test]
    fn prune_removes_stale_entries_only() {
        let limiter = RateLimiter::new();
        let rule = rule(5, 10);
        limiter.check("submitAnswer", "u1", &rule, 100);
        limiter.check("submitAnswer", "u2", &rule, 190);
        limiter.prune(10, 200);
        assert_eq!(limiter.len(), 1);
    }
}
