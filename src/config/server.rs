//! Top-level server identity/capacity configuration.

use super::defaults::{
    default_default_max_room_size, default_max_rooms, default_port, default_region_id,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_default_max_room_size")]
    pub default_max_room_size: u8,
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
    #[serde(default = "default_region_id")]
    pub region_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            default_max_room_size: default_default_max_room_size(),
            max_rooms: default_max_rooms(),
            region_id: default_region_id(),
        }
    }
}
