//! Wire message catalogue (spec SPEC_FULL.md §4.1, §6.3).

use serde::{Deserialize, Serialize};

use super::types::{
    CountryRecord, GameAnswer, GameQuestion, LeaderboardEntry, Room, RoomSettings, User,
};

/// Partial settings update; every field is optional so the host can patch a subset.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RoomSettingsPatch {
    pub difficulty: Option<super::types::Difficulty>,
    pub max_room_size: Option<u8>,
    pub time_per_question: Option<u32>,
    pub game_mode: Option<super::types::GameMode>,
}

/// Inbound (client -> server) messages, dispatched by `type` in the Session Router.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "CREATE_ROOM")]
    CreateRoom { name: String, username: String },
    #[serde(rename = "JOIN_ROOM")]
    JoinRoom {
        #[serde(rename = "inviteCode")]
        invite_code: String,
        username: String,
    },
    #[serde(rename = "LEAVE_ROOM")]
    LeaveRoom,
    #[serde(rename = "SUBMIT_ANSWER")]
    SubmitAnswer { answer: String },
    #[serde(rename = "UPDATE_ROOM_SETTINGS")]
    UpdateRoomSettings { settings: RoomSettingsPatch },
    #[serde(rename = "KICK_USER")]
    KickUser {
        #[serde(rename = "userId")]
        user_id: String,
    },
    #[serde(rename = "START_GAME")]
    StartGame,
    #[serde(rename = "STOP_GAME")]
    StopGame,
    #[serde(rename = "RESTART_GAME")]
    RestartGame,
    #[serde(rename = "HEARTBEAT_RESPONSE")]
    HeartbeatResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStats {
    pub total_questions: usize,
    pub total_answers: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    pub average_time: f64,
    pub difficulty: super::types::Difficulty,
    pub duration: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSuccessPayload {
    pub user_id: String,
    pub is_admin: bool,
    pub user: User,
    pub room: Option<Room>,
}

/// Outbound (server -> client) messages. `timestamp` is stamped fresh on every send
/// by the broadcaster (spec §4.5), never fixed at construction time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "AUTH_SUCCESS")]
    AuthSuccess(AuthSuccessPayload),
    #[serde(rename = "CREATE_ROOM_SUCCESS")]
    CreateRoomSuccess { room: Room },
    #[serde(rename = "JOIN_ROOM_SUCCESS")]
    JoinRoomSuccess { room: Room },
    #[serde(rename = "USER_JOINED")]
    UserJoined { room: Room, user: User },
    #[serde(rename = "USER_LEFT")]
    UserLeft { user_id: String, room: Room },
    #[serde(rename = "USER_KICKED")]
    UserKicked { user_id: String, room: Room },
    #[serde(rename = "HOST_CHANGED")]
    HostChanged { new_host: String },
    #[serde(rename = "KICKED")]
    Kicked,
    #[serde(rename = "GAME_STARTING")]
    GameStarting { countdown: u32 },
    #[serde(rename = "GAME_RESTARTED")]
    GameRestarted { countdown: u32 },
    #[serde(rename = "NEW_QUESTION")]
    NewQuestion {
        question: PublicQuestion,
        total_questions: usize,
    },
    #[serde(rename = "ANSWER_SUBMITTED")]
    AnswerSubmitted {
        user_id: String,
        username: String,
        has_answered: bool,
        total_answers: usize,
        total_players: usize,
        points_awarded: u32,
        score: u32,
    },
    #[serde(rename = "QUESTION_RESULTS")]
    QuestionResults {
        correct_answer: String,
        correct_country: CountryRecord,
        player_answers: Vec<GameAnswer>,
        leaderboard: Vec<LeaderboardEntry>,
    },
    #[serde(rename = "GAME_ENDED")]
    GameEnded {
        leaderboard: Vec<LeaderboardEntry>,
        game_stats: GameStats,
    },
    #[serde(rename = "GAME_STOPPED")]
    GameStopped,
    #[serde(rename = "SETTINGS_UPDATED")]
    SettingsUpdated { settings: RoomSettings },
    #[serde(rename = "ROOM_TTL_WARNING")]
    RoomTtlWarning {
        room_id: String,
        expires_at: i64,
        remaining_ms: i64,
    },
    #[serde(rename = "ROOM_EXPIRED")]
    RoomExpired { room_id: String },
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    #[serde(rename = "PONG")]
    Pong,
    #[serde(rename = "ERROR")]
    Error {
        code: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

/// Question shape sent to clients: carries the shuffled options but not the
/// answer key directly (the key is `correct_answer`, a country code, which
/// clients need in order to render a selection -- unlike a trivia app that
/// hides it, this game reveals the code set but not which one is correct
/// until `QUESTION_RESULTS`).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub index: usize,
    pub country: CountryRecord,
    pub options: Vec<CountryRecord>,
    pub start_time: i64,
    pub end_time: i64,
}

impl From<&GameQuestion> for PublicQuestion {
    fn from(q: &GameQuestion) -> Self {
        Self {
            index: q.index,
            country: q.country.clone(),
            options: q.options.clone(),
            start_time: q.start_time,
            end_time: q.end_time,
        }
    }
}

/// Envelope wrapping every outbound frame with a fresh server timestamp (spec §4.5).
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    #[serde(flatten)]
    pub message: &'a ServerMessage,
    pub timestamp: i64,
}
