//! Layered configuration: compiled-in defaults, config file, environment overrides.
//!
//! See [`loader::load`] for precedence and [`validation::validate_config_security`]
//! for the startup sanity checks run on top of plain deserialization.

mod connection;
mod defaults;
mod heartbeat;
mod loader;
mod logging;
mod rate_limit;
mod room;
mod security;
mod server;
mod types;
mod validation;

pub use connection::ConnectionConfig;
pub use heartbeat::HeartbeatConfig;
pub use loader::load;
pub use logging::{LogFormat, LoggingConfig};
pub use rate_limit::{RateLimitConfig, RateRule};
pub use room::RoomConfig;
pub use security::SecurityConfig;
pub use server::ServerConfig;
pub use types::Config;
pub use validation::validate_config_security;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 3536);
        assert_eq!(cfg.server.default_max_room_size, 5);
        assert_eq!(cfg.room.max_room_lifetime_secs, 14_400);
        assert_eq!(cfg.room.empty_room_timeout_secs, 300);
        assert_eq!(cfg.heartbeat.interval_secs, 30);
        assert_eq!(cfg.heartbeat.response_timeout_secs, 10);
        assert_eq!(cfg.heartbeat.max_missed, 3);
        assert_eq!(cfg.rate_limit.create_room.limit, 5);
        assert_eq!(cfg.rate_limit.submit_answer.window_secs, 10);
        assert_eq!(cfg.connection.max_message_bytes, 131_072);
        assert_eq!(cfg.connection.backpressure_bytes, 1_048_576);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let restored: Config = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.server.port, cfg.server.port);
    }

    #[test]
    fn log_format_display() {
        assert_eq!(LogFormat::Text.to_string(), "text");
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
