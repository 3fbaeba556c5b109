//! Cleanup Service (C12, spec §4.7): three independent periodic sweeps.
//!
//! Each sweep is intentionally isolated from the others -- a bug or stall in
//! one must never block the other two.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::broadcast::{BroadcastTarget, Broadcaster};
use crate::config::RoomConfig;
use crate::metrics::Metrics;
use crate::protocol::ServerMessage;
use crate::rate_limit::RateLimiter;
use crate::server::room_store::RoomStore;

pub struct CleanupService {
    room_store: Arc<RoomStore>,
    broadcaster: Arc<Broadcaster>,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<Metrics>,
    config: RoomConfig,
    rate_limit_prune_window_secs: u64,
}

impl CleanupService {
    pub fn new(
        room_store: Arc<RoomStore>,
        broadcaster: Arc<Broadcaster>,
        rate_limiter: Arc<RateLimiter>,
        metrics: Arc<Metrics>,
        config: RoomConfig,
        rate_limit_prune_window_secs: u64,
    ) -> Self {
        Self {
            room_store,
            broadcaster,
            rate_limiter,
            metrics,
            config,
            rate_limit_prune_window_secs,
        }
    }

    /// Sweep 1: rooms with no members for longer than `empty_room_timeout_secs`.
    pub async fn sweep_empty_rooms(&self, now: i64) {
        for room_id in self.room_store.room_ids() {
            let Some(handle) = self.room_store.get_room(&room_id) else {
                continue;
            };
            let room = handle.lock().await;
            if room.members.is_empty() {
                let age_secs = (now - room.created_at) / 1000;
                if age_secs >= self.config.empty_room_timeout_secs as i64 {
                    let invite_code = room.invite_code.clone();
                    drop(room);
                    self.room_store.remove_room(&room_id, &invite_code);
                    self.metrics.record_room_deleted();
                }
            }
        }
    }

    /// Sweep 2: rooms past their max lifetime, with a warning emitted
    /// `ttl_warning_window_secs` before the hard cutoff.
    pub async fn sweep_room_ttl(&self, now: i64) {
        for room_id in self.room_store.room_ids() {
            let Some(handle) = self.room_store.get_room(&room_id) else {
                continue;
            };

            let (expired, warn_due, room, expires_at) = {
                let room = handle.lock().await;
                let expires_at = room.created_at + (self.config.max_room_lifetime_secs as i64 * 1000);
                let remaining_ms = expires_at - now;
                let expired = remaining_ms <= 0;
                let warn_due =
                    !expired && remaining_ms <= (self.config.ttl_warning_window_secs as i64 * 1000);
                (expired, warn_due, room.clone(), expires_at)
            };

            if expired {
                self.room_store.remove_room(&room_id, &room.invite_code);
                self.metrics.record_room_deleted();
                self.broadcaster.send(
                    BroadcastTarget::Room(&room),
                    &ServerMessage::RoomExpired { room_id: room_id.clone() },
                    now,
                );
            } else if warn_due {
                self.broadcaster.send(
                    BroadcastTarget::Room(&room),
                    &ServerMessage::RoomTtlWarning {
                        room_id: room_id.clone(),
                        expires_at,
                        remaining_ms: expires_at - now,
                    },
                    now,
                );
            }
        }
    }

    /// Sweep 3: users whose `last_active_time` is stale and who aren't in a
    /// room (an active room member is kept alive by the heartbeat monitor
    /// instead, so this only reaps orphaned user records).
    pub fn sweep_inactive_users(&self, now: i64) {
        for user_id in self.room_store.stale_user_ids(self.config.inactive_user_timeout_secs, now) {
            self.room_store.remove_user(&user_id);
        }
    }

    /// Sweep 4: prune rate-limiter entries idle for 3x their window.
    pub fn sweep_rate_limits(&self, now_secs: u64) {
        self.rate_limiter.prune(self.rate_limit_prune_window_secs, now_secs);
    }

    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.cleanup_interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Utc::now().timestamp_millis();
                    self.sweep_empty_rooms(now).await;
                    self.sweep_room_ttl(now).await;
                    self.sweep_inactive_users(now);
                    self.sweep_rate_limits((now / 1000).max(0) as u64);
                }
                _ = shutdown.changed() => {
                    info!("cleanup service shutting down");
                    break;
                }
            }
        }
    }
}
