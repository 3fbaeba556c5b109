//! Wire protocol and domain data model.

pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use messages::{
    AuthSuccessPayload, ClientMessage, Envelope, GameStats, PublicQuestion, RoomSettingsPatch,
    ServerMessage,
};
pub use types::{
    CountryCode, CountryRecord, Difficulty, GameAnswer, GameMode, GameQuestion, GameState,
    LeaderboardEntry, Phase, Room, RoomId, RoomMember, RoomSettings, User, UserId,
};
