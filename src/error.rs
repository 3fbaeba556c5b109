//! Typed error hierarchy shared by the HTTP and WebSocket surfaces.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// One variant per wire-visible error kind.
#[derive(Debug, thiserror::Error, Clone)]
pub enum GameError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("authentication required")]
    Authentication,
    #[error("not authorized to perform this action")]
    Authorization,
    #[error("{0} not found")]
    NotFound(String),
    #[error("rate limit exceeded, retry after {retry_after_ms}ms")]
    RateLimitExceeded { retry_after_ms: u64 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error")]
    Internal,
    #[error("malformed websocket message: {0}")]
    WebsocketMessage(String),
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("game is not active")]
    GameNotActive,
    #[error("invalid game state for this action")]
    InvalidGameState,
    #[error("user not found")]
    UserNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("user is already in a room")]
    UserAlreadyInRoom,
    #[error("username is already taken in this room")]
    UsernameTaken,
    #[error("you have been kicked from this room")]
    KickedFromRoom,
}

impl GameError {
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(_) => "VALIDATION_ERROR",
            GameError::Authentication => "AUTHENTICATION_ERROR",
            GameError::Authorization => "AUTHORIZATION_ERROR",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            GameError::InvalidInput(_) => "INVALID_INPUT",
            GameError::Internal => "INTERNAL_ERROR",
            GameError::WebsocketMessage(_) => "WEBSOCKET_MESSAGE_ERROR",
            GameError::RoomNotFound => "ROOM_NOT_FOUND",
            GameError::RoomFull => "ROOM_FULL",
            GameError::GameNotActive => "GAME_NOT_ACTIVE",
            GameError::InvalidGameState => "INVALID_GAME_STATE",
            GameError::UserNotFound => "USER_NOT_FOUND",
            GameError::PermissionDenied => "PERMISSION_DENIED",
            GameError::UserAlreadyInRoom => "USER_ALREADY_IN_ROOM",
            GameError::UsernameTaken => "USERNAME_TAKEN",
            GameError::KickedFromRoom => "KICKED_FROM_ROOM",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GameError::Validation(_) | GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GameError::Authentication => StatusCode::UNAUTHORIZED,
            GameError::Authorization | GameError::PermissionDenied => StatusCode::FORBIDDEN,
            GameError::NotFound(_) | GameError::RoomNotFound | GameError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            GameError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GameError::RoomFull
            | GameError::GameNotActive
            | GameError::InvalidGameState
            | GameError::UserAlreadyInRoom
            | GameError::UsernameTaken
            | GameError::KickedFromRoom => StatusCode::CONFLICT,
            GameError::WebsocketMessage(_) => StatusCode::BAD_REQUEST,
            GameError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extra structured fields rendered in the `details` object.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GameError::RateLimitExceeded { retry_after_ms } => {
                Some(serde_json::json!({ "retryAfter": retry_after_ms }))
            }
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
