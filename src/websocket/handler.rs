//! Pre-upgrade authentication (spec §6.2/§9): the session cookie is checked
//! *before* the WebSocket handshake completes, not via an in-band AUTH
//! message after the socket is already open. A first-time visitor with no
//! cookie is minted a fresh `userId` and the signed cookie is attached to the
//! upgrade response.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use tracing::warn;
use uuid::Uuid;

use crate::auth::session;
use crate::server::GameServer;

use super::connection::handle_socket;

pub async fn upgrade(
    State(server): State<Arc<GameServer>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        if !server.config.security.allowed_origins.iter().any(|allowed| allowed == origin) {
            warn!(origin, "rejecting websocket upgrade from disallowed origin");
            return axum::http::StatusCode::FORBIDDEN.into_response();
        }
    }

    if server.connections.ip_connection_count(addr.ip()) >= server.config.connection.max_connections_per_ip {
        warn!(ip = %addr.ip(), "rejecting websocket upgrade: per-IP connection limit reached");
        return axum::http::StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    let cookie_name = &server.config.security.session_cookie_name;
    let secret = server
        .config
        .security
        .session_secret
        .clone()
        .unwrap_or_default();
    let secret_bytes = secret.as_bytes();

    let existing_token = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| find_cookie(raw, cookie_name));

    let (user_id, fresh_cookie) = match existing_token.and_then(|token| session::verify(&token, secret_bytes).ok()) {
        Some(user_id) => (user_id, None),
        None => {
            let user_id = Uuid::new_v4().to_string();
            let token = session::sign(&user_id, secret_bytes);
            (user_id.clone(), Some(format!("{}={}; Path=/; HttpOnly; SameSite=Lax", cookie_name, token)))
        }
    };

    let ip = addr.ip();
    let mut response = ws.on_upgrade(move |socket| handle_socket(socket, server, user_id, ip));

    if let Some(cookie_value) = fresh_cookie {
        if let Ok(value) = header::HeaderValue::from_str(&cookie_value) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

fn find_cookie(raw: &str, name: &str) -> Option<String> {
    raw.split(';').find_map(|pair| {
        let pair = pair.trim();
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
