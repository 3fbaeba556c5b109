//! In-process counters exposed at `/api/stats` and `/metrics` (spec §6.1).

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub connections_opened: AtomicU64,
    pub connections_closed: AtomicU64,
    pub rooms_created: AtomicU64,
    pub rooms_deleted: AtomicU64,
    pub games_started: AtomicU64,
    pub games_ended: AtomicU64,
    pub answers_submitted: AtomicU64,
    pub rate_limit_rejections: AtomicU64,
    pub heartbeat_misses: AtomicU64,
    pub users_kicked: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_room_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_room_deleted(&self) {
        self.rooms_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_game_started(&self) {
        self.games_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_game_ended(&self) {
        self.games_ended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_answer_submitted(&self) {
        self.answers_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit_rejection(&self) {
        self.rate_limit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_heartbeat_miss(&self) {
        self.heartbeat_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_user_kicked(&self) {
        self.users_kicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> u64 {
        self.connections_opened
            .load(Ordering::Relaxed)
            .saturating_sub(self.connections_closed.load(Ordering::Relaxed))
    }

    pub fn render_prometheus(&self) -> String {
        format!(
            "# TYPE flags_connections_opened_total counter\n\
             flags_connections_opened_total {}\n\
             # TYPE flags_connections_closed_total counter\n\
             flags_connections_closed_total {}\n\
             # TYPE flags_rooms_created_total counter\n\
             flags_rooms_created_total {}\n\
             # TYPE flags_rooms_deleted_total counter\n\
             flags_rooms_deleted_total {}\n\
             # TYPE flags_games_started_total counter\n\
             flags_games_started_total {}\n\
             # TYPE flags_games_ended_total counter\n\
             flags_games_ended_total {}\n\
             # TYPE flags_answers_submitted_total counter\n\
             flags_answers_submitted_total {}\n\
             # TYPE flags_rate_limit_rejections_total counter\n\
             flags_rate_limit_rejections_total {}\n\
             # TYPE flags_heartbeat_misses_total counter\n\
             flags_heartbeat_misses_total {}\n\
             # TYPE flags_users_kicked_total counter\n\
             flags_users_kicked_total {}\n",
            self.connections_opened.load(Ordering::Relaxed),
            self.connections_closed.load(Ordering::Relaxed),
            self.rooms_created.load(Ordering::Relaxed),
            self.rooms_deleted.load(Ordering::Relaxed),
            self.games_started.load(Ordering::Relaxed),
            self.games_ended.load(Ordering::Relaxed),
            self.answers_submitted.load(Ordering::Relaxed),
            self.rate_limit_rejections.load(Ordering::Relaxed),
            self.heartbeat_misses.load(Ordering::Relaxed),
            self.users_kicked.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_connections_tracks_open_minus_closed() {
        let metrics = Metrics::new();
        metrics.record_connection_opened();
        metrics.record_connection_opened();
        metrics.record_connection_closed();
        assert_eq!(metrics.active_connections(), 1);
    }

    #[test]
    fn render_prometheus_includes_all_counters() {
        let metrics = Metrics::new();
        metrics.record_room_created();
        let rendered = metrics.render_prometheus();
        assert!(rendered.contains("flags_rooms_created_total 1"));
        assert!(rendered.contains("flags_connections_opened_total 0"));
    }
}
