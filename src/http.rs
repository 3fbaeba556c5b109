//! External Surface (C13, spec §4.10/§6.1): thin HTTP adapters around the
//! game server's state, plus the `/ws` upgrade route and CORS policy.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::GameError;
use crate::server::GameServer;

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    region: String,
}

#[derive(Serialize)]
struct StatsResponse {
    active_connections: u64,
    rooms_active: usize,
    users_tracked: usize,
    rate_limit_entries: usize,
}

#[derive(Serialize)]
struct PublicRoomSummary {
    room_id: String,
    name: String,
    member_count: usize,
    max_room_size: u8,
    phase: crate::protocol::types::Phase,
    difficulty: crate::protocol::Difficulty,
}

#[derive(Serialize)]
struct AdminRoomSummary {
    room_id: String,
    invite_code: String,
    member_count: usize,
    host: String,
    created_at: i64,
}

#[derive(Serialize)]
struct AdminUserSummary {
    user_id: String,
    username: String,
    room_id: Option<String>,
}

pub fn build_router(server: Arc<GameServer>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
        .allow_origin(
            server
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>(),
        )
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/api/status", get(status))
        .route("/api/healthz", get(healthz))
        .route("/api/stats", get(stats))
        .route("/api/rooms/{invite_code}", get(room_summary))
        .route("/api/admin/rooms", get(admin_rooms))
        .route("/api/admin/users", get(admin_users))
        .route("/ws", get(crate::websocket::upgrade))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn status(State(server): State<Arc<GameServer>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        region: server.config.server.region_id.clone(),
    })
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn stats(State(server): State<Arc<GameServer>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        active_connections: server.metrics.active_connections(),
        rooms_active: server.room_store.room_count(),
        users_tracked: server.room_store.user_count(),
        rate_limit_entries: server.rate_limiter.len(),
    })
}

async fn room_summary(
    State(server): State<Arc<GameServer>>,
    Path(invite_code): Path<String>,
) -> Result<Json<PublicRoomSummary>, GameError> {
    let handle = server
        .room_store
        .get_room_by_invite_code(&invite_code)
        .ok_or(GameError::RoomNotFound)?;
    let room = handle.lock().await;

    Ok(Json(PublicRoomSummary {
        room_id: room.room_id.clone(),
        name: room.name.clone(),
        member_count: room.members.len(),
        max_room_size: room.settings.max_room_size,
        phase: room.game.phase,
        difficulty: room.settings.difficulty,
    }))
}

fn require_admin(server: &GameServer, headers: &axum::http::HeaderMap) -> Result<(), GameError> {
    let provided = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(GameError::Authentication)?;

    if server.router.verify_admin_key(provided) {
        Ok(())
    } else {
        Err(GameError::Authorization)
    }
}

async fn admin_rooms(
    State(server): State<Arc<GameServer>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<Vec<AdminRoomSummary>>, GameError> {
    require_admin(&server, &headers)?;

    let mut summaries = Vec::new();
    for room_id in server.room_store.room_ids() {
        if let Some(handle) = server.room_store.get_room(&room_id) {
            let room = handle.lock().await;
            summaries.push(AdminRoomSummary {
                room_id: room.room_id.clone(),
                invite_code: room.invite_code.clone(),
                member_count: room.members.len(),
                host: room.host.clone(),
                created_at: room.created_at,
            });
        }
    }
    Ok(Json(summaries))
}

async fn admin_users(
    State(server): State<Arc<GameServer>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<Vec<AdminUserSummary>>, GameError> {
    require_admin(&server, &headers)?;

    let summaries = server
        .connections
        .all_user_ids()
        .into_iter()
        .filter_map(|user_id| server.room_store.get_user(&user_id))
        .map(|user| AdminUserSummary {
            user_id: user.user_id,
            username: user.username,
            room_id: user.room_id,
        })
        .collect();

    Ok(Json(summaries))
}
