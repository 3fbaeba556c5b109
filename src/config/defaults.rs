//! Compiled-in defaults for every configuration field.

pub fn default_port() -> u16 {
    3536
}

pub fn default_default_max_room_size() -> u8 {
    5
}

pub fn default_max_rooms() -> usize {
    10_000
}

pub fn default_region_id() -> String {
    "local".to_string()
}

pub fn default_max_room_lifetime_secs() -> u64 {
    14_400
}

pub fn default_empty_room_timeout_secs() -> u64 {
    300
}

pub fn default_ttl_warning_window_secs() -> u64 {
    300
}

pub fn default_inactive_user_timeout_secs() -> u64 {
    300
}

pub fn default_cleanup_interval_secs() -> u64 {
    300
}

pub fn default_heartbeat_interval_secs() -> u64 {
    30
}

pub fn default_heartbeat_response_timeout_secs() -> u64 {
    10
}

pub fn default_heartbeat_max_missed() -> u32 {
    3
}

pub fn default_max_message_bytes() -> usize {
    131_072
}

pub fn default_max_connections_per_ip() -> usize {
    1
}

pub fn default_rapid_connect_limit() -> u32 {
    3
}

pub fn default_rapid_connect_window_secs() -> u64 {
    60
}

pub fn default_backpressure_bytes() -> usize {
    1_048_576
}

pub fn default_outbound_queue_capacity() -> usize {
    256
}

pub fn default_session_cookie_name() -> String {
    "session_token".to_string()
}

pub fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
        "https://flags.games".to_string(),
        "https://www.flags.games".to_string(),
    ]
}

pub fn default_log_format() -> super::logging::LogFormat {
    super::logging::LogFormat::Text
}

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_log_rotation() -> String {
    "daily".to_string()
}

pub fn default_prune_interval_secs() -> u64 {
    60
}

pub fn default_starting_countdown_secs() -> u32 {
    5
}

pub fn default_results_display_secs() -> u64 {
    5
}
