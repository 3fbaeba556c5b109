//! Cross-field startup validation (spec SPEC_FULL.md §3.1).

use super::Config;

/// Validates sensitive/cross-field configuration invariants.
///
/// This is intentionally separate from serde's per-field defaults: it catches
/// combinations that are individually well-typed but operationally unsafe or
/// nonsensical, such as a heartbeat timeout longer than its own interval.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    if config.heartbeat.response_timeout_secs >= config.heartbeat.interval_secs {
        anyhow::bail!(
            "heartbeat.response_timeout_secs ({}) must be less than heartbeat.interval_secs ({})",
            config.heartbeat.response_timeout_secs,
            config.heartbeat.interval_secs
        );
    }

    if config.heartbeat.max_missed == 0 {
        anyhow::bail!("heartbeat.max_missed must be at least 1");
    }

    if config.room.ttl_warning_window_secs >= config.room.max_room_lifetime_secs {
        anyhow::bail!(
            "room.ttl_warning_window_secs must be less than room.max_room_lifetime_secs"
        );
    }

    if config.server.default_max_room_size < 2 || config.server.default_max_room_size > 5 {
        anyhow::bail!("server.default_max_room_size must be between 2 and 5");
    }

    if config.connection.max_connections_per_ip == 0
        || config.connection.max_connections_per_ip > 5
    {
        anyhow::bail!("connection.max_connections_per_ip must be between 1 and 5");
    }

    if config.security.session_secret.as_deref().unwrap_or("").is_empty() {
        anyhow::bail!(
            "security.session_secret must be set (via FLAGS__SECURITY__SESSION_SECRET or config file)"
        );
    }

    Ok(())
}
