//! Heartbeat Monitor configuration (spec SPEC_FULL.md §4.7).

use super::defaults::{
    default_heartbeat_interval_secs, default_heartbeat_max_missed,
    default_heartbeat_response_timeout_secs,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_heartbeat_response_timeout_secs")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_heartbeat_max_missed")]
    pub max_missed: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval_secs(),
            response_timeout_secs: default_heartbeat_response_timeout_secs(),
            max_missed: default_heartbeat_max_missed(),
        }
    }
}
