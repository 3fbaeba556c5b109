//! Core data model (spec SPEC_FULL.md §3).

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Opaque session-issued user identifier.
pub type UserId = String;
pub type RoomId = String;
pub type CountryCode = String;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// Fixed question-count table per spec §4.2; not a deployment tunable.
    pub fn total_questions(self) -> usize {
        match self {
            Difficulty::Easy => 15,
            Difficulty::Medium => 20,
            Difficulty::Hard => 25,
            Difficulty::Expert => 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Classic,
    Speed,
    Elimination,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Starting,
    Question,
    Results,
    Finished,
}

/// A user record, keyed by its session-issued `userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub room_id: Option<RoomId>,
    pub is_admin: bool,
    pub created: i64,
    pub last_active_time: i64,
    pub socket_id: Option<String>,
}

impl User {
    pub fn new(user_id: UserId, username: String, now: i64) -> Self {
        Self {
            user_id,
            username,
            room_id: None,
            is_admin: false,
            created: now,
            last_active_time: now,
            socket_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    pub difficulty: Difficulty,
    pub max_room_size: u8,
    pub time_per_question: u32,
    pub game_mode: GameMode,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Easy,
            max_room_size: 5,
            time_per_question: 15,
            game_mode: GameMode::Classic,
        }
    }
}

/// A member of a room: a user plus their per-game score bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMember {
    pub user_id: UserId,
    pub username: String,
    pub score: u32,
    pub has_answered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameQuestion {
    pub index: usize,
    pub country: CountryRecord,
    pub options: Vec<CountryRecord>,
    pub correct_answer: CountryCode,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameAnswer {
    pub user_id: UserId,
    pub username: String,
    pub answer: String,
    pub time_to_answer: i64,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub username: String,
    pub score: u32,
    pub correct_answers: u32,
    pub average_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub is_active: bool,
    pub phase: Phase,
    pub current_question: Option<GameQuestion>,
    pub answers: Vec<GameAnswer>,
    pub answer_history: Vec<GameAnswer>,
    pub current_question_index: usize,
    pub total_questions: usize,
    pub difficulty: Difficulty,
    pub game_start_time: Option<i64>,
    pub game_end_time: Option<i64>,
    pub used_countries: HashSet<CountryCode>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl GameState {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            is_active: false,
            phase: Phase::Waiting,
            current_question: None,
            answers: Vec::new(),
            answer_history: Vec::new(),
            current_question_index: 0,
            total_questions: difficulty.total_questions(),
            difficulty,
            game_start_time: None,
            game_end_time: None,
            used_countries: HashSet::new(),
            leaderboard: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub name: String,
    pub host: UserId,
    pub invite_code: String,
    pub settings: RoomSettings,
    pub members: VecDeque<RoomMember>,
    pub kicked_users: HashSet<UserId>,
    pub created_at: i64,
    pub game: GameState,
}

impl Room {
    pub fn member(&self, user_id: &str) -> Option<&RoomMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn member_mut(&mut self, user_id: &str) -> Option<&mut RoomMember> {
        self.members.iter_mut().find(|m| m.user_id == user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }

    pub fn is_host(&self, user_id: &str) -> bool {
        self.host == user_id
    }
}

/// A country record from the embedded dataset (spec §6.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountryRecord {
    pub name: String,
    pub flag: String,
    pub code: CountryCode,
    pub region: String,
}
