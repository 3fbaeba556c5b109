//! Heartbeat Monitor (C6, spec §4.6): server-initiated ping/pong.
//!
//! Unlike a client-driven keepalive, the server owns the clock here: every
//! `interval_secs` it pings every connection and bumps a missed-count: if the
//! client answered within `response_timeout_secs` since the last ping,
//! [`crate::server::session_router`] resets the count to zero on
//! `HEARTBEAT_RESPONSE`. Once a connection's missed-count reaches
//! `max_missed`, the sweep drops it.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use tracing::{info, warn};

use crate::broadcast::{BroadcastTarget, Broadcaster};
use crate::config::HeartbeatConfig;
use crate::metrics::Metrics;
use crate::protocol::ServerMessage;
use crate::server::connection_registry::ConnectionRegistry;

pub struct HeartbeatMonitor {
    registry: Arc<ConnectionRegistry>,
    broadcaster: Arc<Broadcaster>,
    metrics: Arc<Metrics>,
    config: HeartbeatConfig,
}

impl HeartbeatMonitor {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broadcaster: Arc<Broadcaster>,
        metrics: Arc<Metrics>,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            metrics,
            config,
        }
    }

    pub fn reset_missed(&self, user_id: &str) {
        if let Some(conn) = self.registry.get(user_id) {
            conn.missed_heartbeats.store(0, Ordering::Release);
        }
    }

    /// Pings every live connection and evicts anyone who blew past
    /// `max_missed` consecutive rounds.
    pub fn sweep_once(&self, now: i64) {
        for user_id in self.registry.all_user_ids() {
            let Some(conn) = self.registry.get(&user_id) else {
                continue;
            };

            let missed = conn.missed_heartbeats.fetch_add(1, Ordering::AcqRel) + 1;
            if missed > self.config.max_missed {
                warn!(user_id = %user_id, missed, "evicting connection after missed heartbeats");
                self.registry.remove_connection(&user_id);
                self.metrics.record_heartbeat_miss();
                self.metrics.record_connection_closed();
                let _ = conn.outbound.send(Message::Close(None));
                continue;
            }

            self.broadcaster
                .send(BroadcastTarget::User(&user_id), &ServerMessage::Heartbeat, now);
        }
    }

    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Utc::now().timestamp_millis();
                    self.sweep_once(now);
                }
                _ = shutdown.changed() => {
                    info!("heartbeat monitor shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::connection_registry::Connection;
    use std::net::{IpAddr, Ipv4Addr};

    fn monitor() -> (Arc<HeartbeatMonitor>, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone(), 1_048_576));
        let metrics = Arc::new(Metrics::new());
        let config = HeartbeatConfig {
            interval_secs: 30,
            response_timeout_secs: 10,
            max_missed: 2,
        };
        (
            Arc::new(HeartbeatMonitor::new(registry.clone(), broadcaster, metrics, config)),
            registry,
        )
    }

    #[test]
    fn reset_missed_clears_the_counter() {
        let (monitor, registry) = monitor();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        registry.add_connection(Connection::new("u1".to_string(), ip, 0, tx));

        monitor.sweep_once(0);
        monitor.reset_missed("u1");
        assert_eq!(
            registry
                .get("u1")
                .unwrap()
                .missed_heartbeats
                .load(Ordering::Acquire),
            0
        );
    }

    #[test]
    fn eviction_happens_after_max_missed_rounds() {
        let (monitor, registry) = monitor();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        registry.add_connection(Connection::new("u1".to_string(), ip, 0, tx));

        monitor.sweep_once(0);
        monitor.sweep_once(0);
        assert!(registry.get("u1").is_some());
        monitor.sweep_once(0);
        assert!(registry.get("u1").is_none());
    }
}
