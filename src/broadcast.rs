//! Fan-out to connections (C9, spec §4.5).
//!
//! Every outbound frame is wrapped in an [`Envelope`] with a server timestamp
//! stamped at send time, not at construction time, so a message queued for a
//! while before delivery doesn't carry a stale clock reading.

use std::sync::atomic::Ordering;

use axum::extract::ws::{CloseFrame, Message};
use smallvec::SmallVec;
use tracing::warn;

use crate::protocol::{Envelope, Room, ServerMessage, UserId};
use crate::server::connection_registry::{Connection, ConnectionRegistry};

/// Connections are closed with this code (per RFC 6455 §7.4.1) when their
/// outbound queue exceeds the backpressure threshold.
const CLOSE_CODE_TRY_AGAIN_LATER: u16 = 1013;

pub enum BroadcastTarget<'a> {
    Room(&'a Room),
    RoomExcept(&'a Room, &'a UserId),
    User(&'a UserId),
    All,
}

pub struct Broadcaster {
    registry: std::sync::Arc<ConnectionRegistry>,
    backpressure_bytes: usize,
}

impl Broadcaster {
    pub fn new(registry: std::sync::Arc<ConnectionRegistry>, backpressure_bytes: usize) -> Self {
        Self {
            registry,
            backpressure_bytes,
        }
    }

    pub fn send(&self, target: BroadcastTarget<'_>, message: &ServerMessage, now: i64) {
        let envelope = Envelope {
            message,
            timestamp: now,
        };
        let payload = match serde_json::to_string(&envelope) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound message");
                return;
            }
        };

        let recipients: SmallVec<[UserId; 8]> = match target {
            BroadcastTarget::Room(room) => room.members.iter().map(|m| m.user_id.clone()).collect(),
            BroadcastTarget::RoomExcept(room, except) => room
                .members
                .iter()
                .map(|m| m.user_id.clone())
                .filter(|id| id != except)
                .collect(),
            BroadcastTarget::User(user_id) => SmallVec::from_buf([user_id.clone()])
                .into_iter()
                .take(1)
                .collect(),
            BroadcastTarget::All => self.registry.all_user_ids(),
        };

        for user_id in recipients {
            if let Some(conn) = self.registry.get(&user_id) {
                self.safe_send(&conn, &payload);
            }
        }
    }

    /// Sends `payload` to a single connection, enforcing the backpressure
    /// threshold. Returns `false` (and closes the connection) if the queue
    /// is already saturated.
    pub fn safe_send(&self, conn: &Connection, payload: &str) -> bool {
        let incoming_len = payload.len();
        let queued = conn.queued_bytes.load(Ordering::Acquire);

        if queued + incoming_len > self.backpressure_bytes {
            warn!(
                user_id = %conn.user_id,
                queued,
                "connection exceeded backpressure threshold, closing"
            );
            let _ = conn.outbound.send(Message::Close(Some(CloseFrame {
                code: CLOSE_CODE_TRY_AGAIN_LATER,
                reason: "outbound queue saturated".into(),
            })));
            return false;
        }

        conn.queued_bytes.fetch_add(incoming_len, Ordering::AcqRel);
        if conn
            .outbound
            .send(Message::Text(payload.to_string().into()))
            .is_err()
        {
            conn.queued_bytes.fetch_sub(incoming_len, Ordering::AcqRel);
            return false;
        }
        true
    }
}
