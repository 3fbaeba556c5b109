//! Connection-layer configuration: message size, per-IP limits, backpressure.

use super::defaults::{
    default_backpressure_bytes, default_max_connections_per_ip, default_max_message_bytes,
    default_outbound_queue_capacity, default_rapid_connect_limit,
    default_rapid_connect_window_secs,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    #[serde(default = "default_rapid_connect_limit")]
    pub rapid_connect_limit: u32,
    #[serde(default = "default_rapid_connect_window_secs")]
    pub rapid_connect_window_secs: u64,
    #[serde(default = "default_backpressure_bytes")]
    pub backpressure_bytes: usize,
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
            max_connections_per_ip: default_max_connections_per_ip(),
            rapid_connect_limit: default_rapid_connect_limit(),
            rapid_connect_window_secs: default_rapid_connect_window_secs(),
            backpressure_bytes: default_backpressure_bytes(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
        }
    }
}
