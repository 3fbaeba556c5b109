//! Per-connection reader/writer tasks.
//!
//! Each accepted socket gets two tasks: a reader that decodes inbound frames
//! and feeds the Session Router, and a writer that drains an outbound mpsc
//! queue. They're joined with `tokio::select!` so either side closing tears
//! down both.

use std::net::IpAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::UserId;
use crate::server::connection_registry::Connection;
use crate::server::GameServer;

/// Close code for "message too big" (RFC 6455 §7.4.1).
const CLOSE_CODE_MESSAGE_TOO_BIG: u16 = 1009;

pub async fn handle_socket(socket: WebSocket, server: Arc<GameServer>, user_id: UserId, ip: IpAddr) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let now = chrono::Utc::now().timestamp_millis();
    let conn = Connection::new(user_id.clone(), ip, now, outbound_tx);
    if let Some(previous) = server.connections.add_connection(conn.clone()) {
        debug!(user_id = %user_id, "superseding prior connection for this user");
        let _ = previous.outbound.send(Message::Close(Some(CloseFrame {
            code: axum::extract::ws::close_code::NORMAL,
            reason: "replaced by a new connection".into(),
        })));
    }

    server.router.on_open(user_id.clone(), now).await;

    let max_message_bytes = server.config.connection.max_message_bytes;
    let queued_bytes = conn.queued_bytes.clone();

    let writer_user_id = user_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let is_close = matches!(message, Message::Close(_));
            let len = match &message {
                Message::Text(text) => text.len(),
                _ => 0,
            };
            if sink.send(message).await.is_err() {
                break;
            }
            queued_bytes.fetch_sub(len.min(queued_bytes.load(Ordering::Acquire)), Ordering::AcqRel);
            if is_close {
                break;
            }
        }
        let _ = writer_user_id;
    });

    let router = server.router.clone();
    let reader_user_id = user_id.clone();
    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    if text.len() > max_message_bytes {
                        warn!(user_id = %reader_user_id, len = text.len(), "message exceeds size ceiling");
                        if let Some(conn) = router.connections().get(&reader_user_id) {
                            let _ = conn.outbound.send(Message::Close(Some(CloseFrame {
                                code: CLOSE_CODE_MESSAGE_TOO_BIG,
                                reason: "message too large".into(),
                            })));
                        }
                        break;
                    }
                    let now = chrono::Utc::now().timestamp_millis();
                    router.on_message(&reader_user_id, &text, now).await;
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    let now = chrono::Utc::now().timestamp_millis();
    server.router.on_close(&user_id, now).await;
    info!(user_id = %user_id, "connection closed");
}
