use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use flags_game_server::config::Config;
use flags_game_server::server::connection_registry::Connection;
use flags_game_server::server::GameServer;
use tokio::sync::mpsc;

/// Configuration tuned for tests: every cleanup/countdown window is cut down
/// to a second or less so sweeps and timer-driven flows don't make tests
/// wait through real production durations.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.room.starting_countdown_secs = 0;
    config.room.results_display_secs = 0;
    config.room.empty_room_timeout_secs = 1;
    config.room.max_room_lifetime_secs = 2;
    config.room.ttl_warning_window_secs = 1;
    config.room.inactive_user_timeout_secs = 1;
    config.room.cleanup_interval_secs = 1;
    config.security.admin_api_key = Some("test-admin-key".to_string());
    config
}

#[allow(dead_code)]
pub fn test_server() -> Arc<GameServer> {
    Arc::new(GameServer::new(test_config()))
}

/// Registers a connection the way the WebSocket layer does on a real upgrade,
/// minus the socket itself, and runs the router's open hook so the returned
/// receiver sees exactly what a real client would.
#[allow(dead_code)]
pub async fn connect(server: &Arc<GameServer>, user_id: &str, now: i64) -> mpsc::UnboundedReceiver<Message> {
    let (tx, rx) = mpsc::unbounded_channel();
    let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
    server.connections.add_connection(Connection::new(user_id.to_string(), ip, now, tx));
    server.router.on_open(user_id.to_string(), now).await;
    rx
}

#[allow(dead_code)]
pub async fn send(server: &Arc<GameServer>, user_id: &str, raw: &str, now: i64) {
    server.router.on_message(user_id, raw, now).await;
}

#[allow(dead_code)]
pub async fn recv_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a server message")
        .expect("outbound channel closed unexpectedly");
    match msg {
        Message::Text(text) => serde_json::from_str(&text).expect("server message was not valid JSON"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

/// Drains every frame currently queued without blocking, for assertions that
/// don't care about delivery order.
#[allow(dead_code)]
pub fn drain_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            out.push(serde_json::from_str(&text).expect("server message was not valid JSON"));
        }
    }
    out
}

#[allow(dead_code)]
pub fn message_type(value: &serde_json::Value) -> &str {
    value["type"].as_str().expect("message had no type field")
}
