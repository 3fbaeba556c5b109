//! Game Engine (C10, spec §4.2): the per-room state machine.
//!
//! Every transition here takes an already-locked `&mut Room` -- callers hold
//! the room's `tokio::sync::Mutex` guard for the duration of one transition
//! and release it immediately after, per spec §5. Timer ownership (the
//! per-question countdown, the starting/restarting countdown) lives in the
//! session router, which schedules a delayed call back into `next_question`
//! / `end_question`; the engine itself is clock-agnostic beyond stamping
//! `start_time`/`end_time` on questions.

use std::sync::Arc;

use crate::error::GameError;
use crate::protocol::messages::GameStats;
use crate::protocol::types::Phase;
use crate::protocol::{GameAnswer, LeaderboardEntry, Room, RoomSettingsPatch};
use crate::question_provider::QuestionProvider;

/// Flat per-correct-answer award (spec §9 Open Question: no speed bonus).
pub const CORRECT_POINT_COST: u32 = 1;

pub struct GameEngine {
    questions: Arc<QuestionProvider>,
    starting_countdown_secs: u32,
}

impl GameEngine {
    pub fn new(questions: Arc<QuestionProvider>, starting_countdown_secs: u32) -> Self {
        Self { questions, starting_countdown_secs }
    }

    /// Transition 1: `startGame`. Host-only, requires `Waiting` phase.
    pub fn start_game(&self, room: &mut Room, host_id: &str, now: i64) -> Result<u32, GameError> {
        self.require_host(room, host_id)?;
        if room.game.phase != Phase::Waiting {
            return Err(GameError::InvalidGameState);
        }
        if room.members.len() < 2 {
            return Err(GameError::InvalidGameState);
        }

        Ok(self.begin_round(room, now))
    }

    /// Shared reset-and-enter-`Starting` step for `startGame`/`restartGame`,
    /// factored out since they gate on different phases but otherwise do the
    /// same thing.
    fn begin_round(&self, room: &mut Room, now: i64) -> u32 {
        room.game = crate::protocol::types::GameState::new(room.settings.difficulty);
        room.game.is_active = true;
        room.game.phase = Phase::Starting;
        room.game.game_start_time = Some(now);
        for member in room.members.iter_mut() {
            member.score = 0;
            member.has_answered = false;
        }

        self.starting_countdown_secs
    }

    /// Transition 2: `nextQuestion`. Draws the next question from the pool,
    /// or falls through to `end_game` if the pool is exhausted.
    pub fn next_question(&self, room: &mut Room, now: i64) -> Result<Option<()>, GameError> {
        if !room.game.is_active {
            return Err(GameError::GameNotActive);
        }

        let index = room.game.current_question_index;
        if index >= room.game.total_questions {
            return Ok(None);
        }

        let end_time = now + (room.settings.time_per_question as i64 * 1000);
        let Some(question) =
            self.questions
                .next_question(index, &room.game.used_countries, now, end_time)
        else {
            return Ok(None);
        };

        room.game.used_countries.insert(question.correct_answer.clone());
        room.game.current_question = Some(question);
        room.game.phase = Phase::Question;
        room.game.answers.clear();
        for member in room.members.iter_mut() {
            member.has_answered = false;
        }

        Ok(Some(()))
    }

    /// Transition 3: `submitAnswer`. Scores against the active question and
    /// records the attempt; idempotent per user within a question -- a
    /// second submission is a silent no-op (`Ok(None)`), not an error, so
    /// callers must not broadcast anything for it.
    pub fn submit_answer(
        &self,
        room: &mut Room,
        user_id: &str,
        raw_answer: &str,
        now: i64,
    ) -> Result<Option<GameAnswer>, GameError> {
        if room.game.phase != Phase::Question {
            return Err(GameError::InvalidGameState);
        }

        let username = room
            .member(user_id)
            .map(|m| m.username.clone())
            .ok_or(GameError::UserNotFound)?;

        if room.game.answers.iter().any(|a| a.user_id == user_id) {
            return Ok(None);
        }

        let question = room
            .game
            .current_question
            .as_ref()
            .ok_or(GameError::InvalidGameState)?;

        let is_correct = raw_answer.eq_ignore_ascii_case(&question.correct_answer);
        let points_awarded = if is_correct { CORRECT_POINT_COST } else { 0 };
        let time_to_answer = (now - question.start_time).max(0);

        let answer = GameAnswer {
            user_id: user_id.to_string(),
            username,
            answer: raw_answer.to_string(),
            time_to_answer,
            is_correct,
            points_awarded,
            timestamp: now,
        };

        room.game.answers.push(answer.clone());
        if let Some(member) = room.member_mut(user_id) {
            member.has_answered = true;
            member.score += points_awarded;
        }

        Ok(Some(answer))
    }

    /// Transition 4: `endQuestion`. Closes the current question, folds
    /// answers into history, and recomputes the leaderboard.
    pub fn end_question(&self, room: &mut Room) -> Result<(), GameError> {
        if room.game.phase != Phase::Question {
            return Err(GameError::InvalidGameState);
        }

        room.game.answer_history.append(&mut room.game.answers);
        room.game.current_question_index += 1;
        room.game.phase = Phase::Results;
        room.game.leaderboard = self.compute_leaderboard(room);

        Ok(())
    }

    /// Transition 5: `endGame`. Finalizes stats and leaves the room in
    /// `Finished`, where `UPDATE_ROOM_SETTINGS` and `RESTART_GAME` are still
    /// accepted but a fresh `startGame` is not, until the host restarts or a
    /// member leaves and rejoins to reset it.
    pub fn end_game(&self, room: &mut Room, now: i64) -> Result<GameStats, GameError> {
        room.game.phase = Phase::Finished;
        room.game.is_active = false;
        room.game.game_end_time = Some(now);
        room.game.leaderboard = self.compute_leaderboard(room);

        let total_answers = room.game.answer_history.len();
        let correct_answers = room.game.answer_history.iter().filter(|a| a.is_correct).count();
        let accuracy = if total_answers > 0 {
            correct_answers as f64 / total_answers as f64
        } else {
            0.0
        };
        let average_time = if total_answers > 0 {
            room.game.answer_history.iter().map(|a| a.time_to_answer).sum::<i64>() as f64
                / total_answers as f64
        } else {
            0.0
        };
        let duration = room
            .game
            .game_start_time
            .map(|start| now - start)
            .unwrap_or(0);

        let stats = GameStats {
            total_questions: room.game.current_question_index,
            total_answers,
            correct_answers,
            accuracy,
            average_time,
            difficulty: room.game.difficulty,
            duration,
        };

        Ok(stats)
    }

    /// Transition 6: `stopGame`. Host-only abort, jumps straight to Waiting
    /// from any phase.
    pub fn stop_game(&self, room: &mut Room, host_id: &str) -> Result<(), GameError> {
        self.require_host(room, host_id)?;
        room.game = crate::protocol::types::GameState::new(room.settings.difficulty);
        for member in room.members.iter_mut() {
            member.score = 0;
            member.has_answered = false;
        }
        Ok(())
    }

    /// Transition 7: `restartGame`. Host-only, only valid once a game has
    /// finished; reinitializes state and re-enters Starting.
    pub fn restart_game(&self, room: &mut Room, host_id: &str, now: i64) -> Result<u32, GameError> {
        self.require_host(room, host_id)?;
        if room.game.phase != Phase::Finished {
            return Err(GameError::InvalidGameState);
        }
        if room.members.len() < 2 {
            return Err(GameError::InvalidGameState);
        }

        Ok(self.begin_round(room, now))
    }

    pub fn apply_settings_patch(
        &self,
        room: &mut Room,
        host_id: &str,
        patch: RoomSettingsPatch,
    ) -> Result<(), GameError> {
        self.require_host(room, host_id)?;
        if room.game.phase != Phase::Waiting && room.game.phase != Phase::Finished {
            return Err(GameError::InvalidGameState);
        }

        if let Some(difficulty) = patch.difficulty {
            room.settings.difficulty = difficulty;
        }
        if let Some(max_room_size) = patch.max_room_size {
            room.settings.max_room_size = max_room_size;
        }
        if let Some(time_per_question) = patch.time_per_question {
            room.settings.time_per_question = time_per_question;
        }
        if let Some(game_mode) = patch.game_mode {
            room.settings.game_mode = game_mode;
        }

        Ok(())
    }

    fn compute_leaderboard(&self, room: &Room) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = room
            .members
            .iter()
            .map(|member| {
                let history: Vec<&GameAnswer> = room
                    .game
                    .answer_history
                    .iter()
                    .filter(|a| a.user_id == member.user_id)
                    .collect();
                let correct_answers = history.iter().filter(|a| a.is_correct).count() as u32;
                let average_time = if history.is_empty() {
                    0.0
                } else {
                    history.iter().map(|a| a.time_to_answer).sum::<i64>() as f64 / history.len() as f64
                };

                LeaderboardEntry {
                    user_id: member.user_id.clone(),
                    username: member.username.clone(),
                    score: member.score,
                    correct_answers,
                    average_time,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }

    fn require_host(&self, room: &Room, user_id: &str) -> Result<(), GameError> {
        if !room.is_host(user_id) {
            return Err(GameError::PermissionDenied);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{Difficulty, GameMode, RoomMember, RoomSettings};
    use std::collections::{HashSet, VecDeque};

    fn test_room() -> Room {
        let settings = RoomSettings {
            difficulty: Difficulty::Easy,
            max_room_size: 5,
            time_per_question: 15,
            game_mode: GameMode::Classic,
        };
        Room {
            room_id: "room-1".to_string(),
            name: "Test Room".to_string(),
            host: "host-1".to_string(),
            invite_code: "ABC123".to_string(),
            settings: settings.clone(),
            members: VecDeque::from(vec![
                RoomMember { user_id: "host-1".to_string(), username: "Host".to_string(), score: 0, has_answered: false },
                RoomMember { user_id: "guest-1".to_string(), username: "Guest".to_string(), score: 0, has_answered: false },
            ]),
            kicked_users: HashSet::new(),
            created_at: 0,
            game: crate::protocol::types::GameState::new(settings.difficulty),
        }
    }

    fn engine() -> GameEngine {
        GameEngine::new(Arc::new(QuestionProvider::new()), 3)
    }

    #[test]
    fn start_game_requires_host() {
        let engine = engine();
        let mut room = test_room();
        assert!(matches!(
            engine.start_game(&mut room, "guest-1", 0),
            Err(GameError::PermissionDenied)
        ));
    }

    #[test]
    fn start_game_requires_two_members() {
        let engine = engine();
        let mut room = test_room();
        room.members.pop_back();
        assert!(matches!(
            engine.start_game(&mut room, "host-1", 0),
            Err(GameError::InvalidGameState)
        ));
    }

    #[test]
    fn full_round_trip_through_one_question() {
        let engine = engine();
        let mut room = test_room();
        engine.start_game(&mut room, "host-1", 0).unwrap();
        assert_eq!(room.game.phase, Phase::Starting);

        engine.next_question(&mut room, 1000).unwrap();
        assert_eq!(room.game.phase, Phase::Question);
        let correct = room.game.current_question.as_ref().unwrap().correct_answer.clone();

        let answer = engine.submit_answer(&mut room, "guest-1", &correct, 1500).unwrap().unwrap();
        assert!(answer.is_correct);
        assert_eq!(room.member("guest-1").unwrap().score, CORRECT_POINT_COST);

        engine.end_question(&mut room).unwrap();
        assert_eq!(room.game.phase, Phase::Results);
        assert_eq!(room.game.leaderboard[0].user_id, "guest-1");
    }

    #[test]
    fn second_submission_in_same_question_is_a_silent_no_op() {
        let engine = engine();
        let mut room = test_room();
        engine.start_game(&mut room, "host-1", 0).unwrap();
        engine.next_question(&mut room, 1000).unwrap();
        let correct = room.game.current_question.as_ref().unwrap().correct_answer.clone();
        assert!(engine.submit_answer(&mut room, "guest-1", &correct, 1500).unwrap().is_some());
        assert!(engine.submit_answer(&mut room, "guest-1", &correct, 1600).unwrap().is_none());
        assert_eq!(room.member("guest-1").unwrap().score, CORRECT_POINT_COST);
    }

    #[test]
    fn stop_game_resets_scores_and_phase() {
        let engine = engine();
        let mut room = test_room();
        engine.start_game(&mut room, "host-1", 0).unwrap();
        engine.next_question(&mut room, 1000).unwrap();
        engine.stop_game(&mut room, "host-1").unwrap();
        assert_eq!(room.game.phase, Phase::Waiting);
        assert_eq!(room.member("guest-1").unwrap().score, 0);
    }

    #[test]
    fn restart_game_requires_finished_phase() {
        let engine = engine();
        let mut room = test_room();
        engine.start_game(&mut room, "host-1", 0).unwrap();
        assert!(matches!(
            engine.restart_game(&mut room, "host-1", 10),
            Err(GameError::InvalidGameState)
        ));
    }

    #[test]
    fn restart_game_succeeds_once_finished() {
        let engine = engine();
        let mut room = test_room();
        engine.start_game(&mut room, "host-1", 0).unwrap();
        engine.next_question(&mut room, 1000).unwrap();
        engine.end_question(&mut room).unwrap();
        engine.end_game(&mut room, 5000).unwrap();
        assert_eq!(room.game.phase, Phase::Finished);

        let countdown = engine.restart_game(&mut room, "host-1", 6000).unwrap();
        assert_eq!(countdown, 3);
        assert_eq!(room.game.phase, Phase::Starting);
    }

    #[test]
    fn end_game_computes_stats_and_leaves_phase_finished() {
        let engine = engine();
        let mut room = test_room();
        engine.start_game(&mut room, "host-1", 0).unwrap();
        engine.next_question(&mut room, 1000).unwrap();
        let correct = room.game.current_question.as_ref().unwrap().correct_answer.clone();
        engine.submit_answer(&mut room, "guest-1", &correct, 1500).unwrap();
        engine.end_question(&mut room).unwrap();

        let stats = engine.end_game(&mut room, 5000).unwrap();
        assert_eq!(stats.total_answers, 1);
        assert_eq!(stats.correct_answers, 1);
        assert_eq!(room.game.phase, Phase::Finished);
        assert!(!room.game.is_active);
    }
}
