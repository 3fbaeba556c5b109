//! Server-side runtime: connection tracking, game state machine, routing,
//! and the periodic maintenance sweeps that keep memory bounded.

pub mod cleanup;
pub mod connection_registry;
pub mod game_engine;
pub mod heartbeat;
pub mod room_store;
pub mod session_router;

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::question_provider::QuestionProvider;
use crate::rate_limit::RateLimiter;

use cleanup::CleanupService;
use connection_registry::ConnectionRegistry;
use game_engine::GameEngine;
use heartbeat::HeartbeatMonitor;
use room_store::RoomStore;
use session_router::SessionRouter;

/// Owns every long-lived subsystem. Cloned cheaply (it's all `Arc` fields)
/// and handed to the HTTP/WebSocket layers.
#[derive(Clone)]
pub struct GameServer {
    pub config: Arc<Config>,
    pub room_store: Arc<RoomStore>,
    pub connections: Arc<ConnectionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
    pub router: Arc<SessionRouter>,
    pub heartbeat: Arc<HeartbeatMonitor>,
    pub cleanup: Arc<CleanupService>,
}

impl GameServer {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let room_store = Arc::new(RoomStore::new());
        let connections = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(
            connections.clone(),
            config.connection.backpressure_bytes,
        ));
        let rate_limiter = Arc::new(RateLimiter::new());
        let metrics = Arc::new(Metrics::new());
        let questions = Arc::new(QuestionProvider::new());
        let engine = Arc::new(GameEngine::new(questions, config.room.starting_countdown_secs));

        let router = Arc::new(SessionRouter::new(
            room_store.clone(),
            connections.clone(),
            broadcaster.clone(),
            rate_limiter.clone(),
            config.rate_limit.clone(),
            engine,
            metrics.clone(),
            config.security.admin_api_key.clone().unwrap_or_default(),
            config.room.results_display_secs,
        ));

        let heartbeat = Arc::new(HeartbeatMonitor::new(
            connections.clone(),
            broadcaster.clone(),
            metrics.clone(),
            config.heartbeat.clone(),
        ));

        let cleanup = Arc::new(CleanupService::new(
            room_store.clone(),
            broadcaster.clone(),
            rate_limiter.clone(),
            metrics.clone(),
            config.room.clone(),
            config.rate_limit.prune_interval_secs,
        ));

        Self {
            config,
            room_store,
            connections,
            broadcaster,
            rate_limiter,
            metrics,
            router,
            heartbeat,
            cleanup,
        }
    }

    /// Spawns the background heartbeat and cleanup loops, returning a
    /// shutdown sender that stops both when dropped or signaled.
    pub fn spawn_background_tasks(&self) -> tokio::sync::watch::Sender<bool> {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        tokio::spawn({
            let heartbeat = self.heartbeat.clone();
            let rx = shutdown_rx.clone();
            async move { heartbeat.run(rx).await }
        });

        tokio::spawn({
            let cleanup = self.cleanup.clone();
            let rx = shutdown_rx.clone();
            async move { cleanup.run(rx).await }
        });

        shutdown_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_server_constructs_with_default_config() {
        let server = GameServer::new(Config::default());
        assert_eq!(server.room_store.room_count(), 0);
        assert_eq!(server.connections.len(), 0);
    }
}
