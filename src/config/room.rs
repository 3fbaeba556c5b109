//! Room lifecycle and cleanup configuration (spec SPEC_FULL.md §3.1, §4.8).

use super::defaults::{
    default_cleanup_interval_secs, default_empty_room_timeout_secs,
    default_inactive_user_timeout_secs, default_max_room_lifetime_secs,
    default_results_display_secs, default_starting_countdown_secs,
    default_ttl_warning_window_secs,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoomConfig {
    #[serde(default = "default_max_room_lifetime_secs")]
    pub max_room_lifetime_secs: u64,
    #[serde(default = "default_empty_room_timeout_secs")]
    pub empty_room_timeout_secs: u64,
    #[serde(default = "default_ttl_warning_window_secs")]
    pub ttl_warning_window_secs: u64,
    #[serde(default = "default_inactive_user_timeout_secs")]
    pub inactive_user_timeout_secs: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Countdown shown client-side between `GAME_STARTING`/`GAME_RESTARTED`
    /// and the first question. Shortened in tests to avoid real sleeps.
    #[serde(default = "default_starting_countdown_secs")]
    pub starting_countdown_secs: u32,
    /// How long `QUESTION_RESULTS` stays up before the next question (or
    /// `GAME_ENDED`) is pushed.
    #[serde(default = "default_results_display_secs")]
    pub results_display_secs: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_room_lifetime_secs: default_max_room_lifetime_secs(),
            empty_room_timeout_secs: default_empty_room_timeout_secs(),
            ttl_warning_window_secs: default_ttl_warning_window_secs(),
            inactive_user_timeout_secs: default_inactive_user_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            starting_countdown_secs: default_starting_countdown_secs(),
            results_display_secs: default_results_display_secs(),
        }
    }
}
