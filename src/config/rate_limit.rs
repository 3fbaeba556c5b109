//! Rate Limiter configuration (spec SPEC_FULL.md §4.4).

use super::defaults::default_prune_interval_secs;
use serde::{Deserialize, Serialize};

/// A single (limit, window) rule.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct RateRule {
    pub limit: u32,
    pub window_secs: u64,
}

impl RateRule {
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_create_room_rule")]
    pub create_room: RateRule,
    #[serde(default = "default_join_room_rule")]
    pub join_room: RateRule,
    #[serde(default = "default_start_game_rule")]
    pub start_game: RateRule,
    #[serde(default = "default_submit_answer_rule")]
    pub submit_answer: RateRule,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_create_room_rule() -> RateRule {
    RateRule::new(5, 60)
}

fn default_join_room_rule() -> RateRule {
    RateRule::new(20, 60)
}

fn default_start_game_rule() -> RateRule {
    RateRule::new(10, 60)
}

fn default_submit_answer_rule() -> RateRule {
    RateRule::new(50, 10)
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            create_room: default_create_room_rule(),
            join_room: default_join_room_rule(),
            start_game: default_start_game_rule(),
            submit_answer: default_submit_answer_rule(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}
