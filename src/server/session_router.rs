//! Session Router (C11, spec §4.1): the single entry point for every inbound
//! WebSocket frame. `on_open`/`on_message`/`on_close` mirror the verbs the
//! transport layer calls into.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message};
use dashmap::DashMap;
use tracing::{info_span, warn, Instrument};

use crate::auth::secrets_match;
use crate::broadcast::{BroadcastTarget, Broadcaster};
use crate::config::RateLimitConfig;
use crate::error::GameError;
use crate::metrics::Metrics;
use crate::protocol::types::Phase;
use crate::protocol::{
    AuthSuccessPayload, ClientMessage, GameStats, PublicQuestion, RoomId, RoomMember,
    RoomSettings, ServerMessage, User, UserId,
};
use crate::rate_limit::RateLimiter;
use crate::server::connection_registry::ConnectionRegistry;
use crate::server::game_engine::GameEngine;
use crate::server::room_store::RoomStore;

pub struct SessionRouter {
    room_store: Arc<RoomStore>,
    connections: Arc<ConnectionRegistry>,
    broadcaster: Arc<Broadcaster>,
    rate_limiter: Arc<RateLimiter>,
    rate_limit_config: RateLimitConfig,
    engine: Arc<GameEngine>,
    metrics: Arc<Metrics>,
    admin_api_key: String,
    results_display_secs: u64,
    room_generations: DashMap<RoomId, Arc<AtomicU64>>,
}

impl SessionRouter {
    pub fn new(
        room_store: Arc<RoomStore>,
        connections: Arc<ConnectionRegistry>,
        broadcaster: Arc<Broadcaster>,
        rate_limiter: Arc<RateLimiter>,
        rate_limit_config: RateLimitConfig,
        engine: Arc<GameEngine>,
        metrics: Arc<Metrics>,
        admin_api_key: String,
        results_display_secs: u64,
    ) -> Self {
        Self {
            room_store,
            connections,
            broadcaster,
            rate_limiter,
            rate_limit_config,
            engine,
            metrics,
            admin_api_key,
            results_display_secs,
            room_generations: DashMap::new(),
        }
    }

    pub async fn on_open(self: &Arc<Self>, user_id: UserId, now: i64) {
        self.room_store.upsert_user(User::new(user_id.clone(), String::new(), now));
        let user = self.room_store.get_user(&user_id).expect("just inserted");
        self.broadcaster.send(
            BroadcastTarget::User(&user_id),
            &ServerMessage::AuthSuccess(AuthSuccessPayload {
                user_id: user_id.clone(),
                is_admin: user.is_admin,
                user,
                room: None,
            }),
            now,
        );
        self.metrics.record_connection_opened();
    }

    pub async fn on_close(self: &Arc<Self>, user_id: &str, now: i64) {
        self.connections.remove_connection(user_id);
        self.metrics.record_connection_closed();

        let Some(user) = self.room_store.get_user(user_id) else {
            return;
        };
        if let Some(room_id) = user.room_id {
            self.depart_room(&room_id, user_id, now).await;
        }
        self.room_store.remove_user(user_id);
    }

    pub async fn on_message(self: &Arc<Self>, user_id: &str, raw: &str, now: i64) {
        let message: ClientMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(err) => {
                self.send_error(user_id, GameError::WebsocketMessage(err.to_string()), now);
                return;
            }
        };

        let span = info_span!("client_message", user_id = %user_id);
        async {
            if let Err(err) = self.dispatch(user_id, message, now).await {
                self.send_error(user_id, err, now);
            }
        }
        .instrument(span)
        .await;
    }

    async fn dispatch(
        self: &Arc<Self>,
        user_id: &str,
        message: ClientMessage,
        now: i64,
    ) -> Result<(), GameError> {
        match message {
            ClientMessage::CreateRoom { name, username } => {
                self.guard_rate_limit("createRoom", user_id, &self.rate_limit_config.create_room, now)?;
                self.handle_create_room(user_id, name, username, now).await
            }
            ClientMessage::JoinRoom { invite_code, username } => {
                self.guard_rate_limit("joinRoom", user_id, &self.rate_limit_config.join_room, now)?;
                self.handle_join_room(user_id, invite_code, username, now).await
            }
            ClientMessage::LeaveRoom => self.handle_leave_room(user_id, now).await,
            ClientMessage::SubmitAnswer { answer } => {
                self.guard_rate_limit("submitAnswer", user_id, &self.rate_limit_config.submit_answer, now)?;
                self.handle_submit_answer(user_id, answer, now).await
            }
            ClientMessage::UpdateRoomSettings { settings } => {
                self.handle_update_settings(user_id, settings, now).await
            }
            ClientMessage::KickUser { user_id: target } => self.handle_kick_user(user_id, &target, now).await,
            ClientMessage::StartGame => {
                self.guard_rate_limit("startGame", user_id, &self.rate_limit_config.start_game, now)?;
                self.handle_start_game(user_id, now).await
            }
            ClientMessage::StopGame => self.handle_stop_game(user_id, now).await,
            ClientMessage::RestartGame => self.handle_restart_game(user_id, now).await,
            ClientMessage::HeartbeatResponse => Ok(()),
        }
    }

    fn guard_rate_limit(
        &self,
        action: &str,
        user_id: &str,
        rule: &crate::config::RateRule,
        now: i64,
    ) -> Result<(), GameError> {
        let now_secs = (now / 1000).max(0) as u64;
        if self.rate_limiter.check(action, user_id, rule, now_secs) {
            Ok(())
        } else {
            self.metrics.record_rate_limit_rejection();
            Err(GameError::RateLimitExceeded {
                retry_after_ms: rule.window_secs * 1000,
            })
        }
    }

    async fn handle_create_room(
        self: &Arc<Self>,
        user_id: &str,
        name: String,
        username: String,
        now: i64,
    ) -> Result<(), GameError> {
        let clean_username = crate::protocol::validation::validate_username(&username)
            .map_err(GameError::Validation)?;

        let handle = self
            .room_store
            .create_room(name, user_id.to_string(), RoomSettings::default(), now)
            .ok_or(GameError::Internal)?;

        let room = {
            let mut room = handle.lock().await;
            room.members[0].username = clean_username.clone();
            room.clone()
        };

        if let Some(mut user) = self.room_store.get_user(user_id) {
            user.username = clean_username;
            user.room_id = Some(room.room_id.clone());
            user.is_admin = true;
            self.room_store.upsert_user(user);
        }

        self.metrics.record_room_created();
        self.broadcaster
            .send(BroadcastTarget::User(&user_id.to_string()), &ServerMessage::CreateRoomSuccess { room }, now);
        Ok(())
    }

    async fn handle_join_room(
        self: &Arc<Self>,
        user_id: &str,
        invite_code: String,
        username: String,
        now: i64,
    ) -> Result<(), GameError> {
        crate::protocol::validation::validate_invite_code(&invite_code).map_err(GameError::Validation)?;
        let clean_username = crate::protocol::validation::validate_username(&username)
            .map_err(GameError::Validation)?;

        let handle = self
            .room_store
            .get_room_by_invite_code(&invite_code)
            .ok_or(GameError::RoomNotFound)?;

        let (room, new_member) = {
            let mut room = handle.lock().await;
            if room.kicked_users.contains(user_id) {
                return Err(GameError::KickedFromRoom);
            }
            if room.is_member(user_id) {
                return Err(GameError::UserAlreadyInRoom);
            }
            if room.members.iter().any(|m| m.username == clean_username) {
                return Err(GameError::UsernameTaken);
            }
            if room.members.len() >= room.settings.max_room_size as usize {
                return Err(GameError::RoomFull);
            }

            let member = RoomMember {
                user_id: user_id.to_string(),
                username: clean_username.clone(),
                score: 0,
                has_answered: false,
            };
            room.members.push_back(member.clone());
            (room.clone(), member)
        };

        if let Some(mut user) = self.room_store.get_user(user_id) {
            user.username = clean_username;
            user.room_id = Some(room.room_id.clone());
            self.room_store.upsert_user(user);
        }

        self.broadcaster
            .send(BroadcastTarget::User(&user_id.to_string()), &ServerMessage::JoinRoomSuccess { room: room.clone() }, now);
        self.broadcaster.send(
            BroadcastTarget::RoomExcept(&room, &user_id.to_string()),
            &ServerMessage::UserJoined {
                room: room.clone(),
                user: User {
                    user_id: new_member.user_id,
                    username: new_member.username,
                    room_id: Some(room.room_id.clone()),
                    is_admin: false,
                    created: now,
                    last_active_time: now,
                    socket_id: None,
                },
            },
            now,
        );
        Ok(())
    }

    async fn handle_leave_room(self: &Arc<Self>, user_id: &str, now: i64) -> Result<(), GameError> {
        let user = self.room_store.get_user(user_id).ok_or(GameError::UserNotFound)?;
        let room_id = user.room_id.ok_or(GameError::RoomNotFound)?;
        self.depart_room(&room_id, user_id, now).await;
        Ok(())
    }

    async fn depart_room(self: &Arc<Self>, room_id: &str, user_id: &str, now: i64) {
        let Some(handle) = self.room_store.get_room(room_id) else {
            return;
        };

        let (room_after, should_delete, new_host) = {
            let mut room = handle.lock().await;
            room.members.retain(|m| m.user_id != user_id);

            let mut promoted = None;
            if room.host == user_id {
                if let Some(next) = room.members.front() {
                    promoted = Some(next.user_id.clone());
                    room.host = next.user_id.clone();
                }
            }
            (room.clone(), room.members.is_empty(), promoted)
        };

        if let Some(mut user) = self.room_store.get_user(user_id) {
            user.room_id = None;
            user.is_admin = false;
            self.room_store.upsert_user(user);
        }

        if should_delete {
            self.room_store.remove_room(&room_after.room_id, &room_after.invite_code);
            self.metrics.record_room_deleted();
            return;
        }

        if let Some(new_host) = new_host {
            if let Some(mut promoted_user) = self.room_store.get_user(&new_host) {
                promoted_user.is_admin = true;
                self.room_store.upsert_user(promoted_user);
            }
            self.broadcaster.send(
                BroadcastTarget::Room(&room_after),
                &ServerMessage::HostChanged { new_host },
                now,
            );
        }
        self.broadcaster.send(
            BroadcastTarget::Room(&room_after),
            &ServerMessage::UserLeft { user_id: user_id.to_string(), room: room_after.clone() },
            now,
        );
    }

    async fn handle_submit_answer(self: &Arc<Self>, user_id: &str, answer: String, now: i64) -> Result<(), GameError> {
        let clean_answer = crate::protocol::validation::sanitize_answer(&answer).map_err(GameError::Validation)?;
        let room_id = self.user_room_id(user_id)?;
        let handle = self.room_store.get_room(&room_id).ok_or(GameError::RoomNotFound)?;

        let (room, answered) = {
            let mut room = handle.lock().await;
            let answered = self.engine.submit_answer(&mut room, user_id, &clean_answer, now)?;
            (room.clone(), answered)
        };

        // A repeat submission within the same question is a no-op per the
        // engine's idempotence rule: no broadcast, no re-triggering of the
        // all-answered check (the first submission already did, if it applied).
        let Some(answered) = answered else {
            return Ok(());
        };

        self.metrics.record_answer_submitted();
        self.broadcaster.send(
            BroadcastTarget::Room(&room),
            &ServerMessage::AnswerSubmitted {
                user_id: answered.user_id.clone(),
                username: answered.username.clone(),
                has_answered: true,
                total_answers: room.game.answers.len(),
                total_players: room.members.len(),
                points_awarded: answered.points_awarded,
                score: room.member(user_id).map(|m| m.score).unwrap_or(0),
            },
            now,
        );

        if room.game.answers.len() >= room.members.len() {
            self.preempt_question_timer(room_id);
        }

        Ok(())
    }

    /// Called when every member has answered before `time_per_question`
    /// elapses. The running `run_question_cycle` task is still asleep on the
    /// full per-question timer, so it can't be trusted to end the question
    /// or to schedule the next one on time; instead this bumps the
    /// generation (aborting that stale sleep once it wakes) and takes over
    /// driving `finish_question` -> `results_display_secs` -> next question
    /// itself, landing on the 3s results window instead of the leftover
    /// question time plus the results window.
    fn preempt_question_timer(self: &Arc<Self>, room_id: RoomId) {
        self.bump_generation(&room_id);
        let generation = self.current_generation(&room_id);
        let router = Arc::clone(self);
        tokio::spawn(async move {
            router.finish_question(&room_id).await;

            tokio::time::sleep(Duration::from_secs(router.results_display_secs)).await;
            if !router.generation_still_current(&room_id, generation) {
                return;
            }

            Box::pin(router.run_question_cycle(room_id, generation)).await;
        });
    }

    async fn handle_update_settings(
        self: &Arc<Self>,
        user_id: &str,
        patch: crate::protocol::RoomSettingsPatch,
        now: i64,
    ) -> Result<(), GameError> {
        let room_id = self.user_room_id(user_id)?;
        let handle = self.room_store.get_room(&room_id).ok_or(GameError::RoomNotFound)?;

        let room = {
            let mut room = handle.lock().await;
            self.engine.apply_settings_patch(&mut room, user_id, patch)?;
            room.clone()
        };

        self.broadcaster.send(
            BroadcastTarget::Room(&room),
            &ServerMessage::SettingsUpdated { settings: room.settings.clone() },
            now,
        );
        Ok(())
    }

    async fn handle_kick_user(self: &Arc<Self>, user_id: &str, target: &str, now: i64) -> Result<(), GameError> {
        let room_id = self.user_room_id(user_id)?;
        let handle = self.room_store.get_room(&room_id).ok_or(GameError::RoomNotFound)?;

        let room = {
            let mut room = handle.lock().await;
            if !room.is_host(user_id) {
                return Err(GameError::PermissionDenied);
            }
            if !room.is_member(target) {
                return Err(GameError::UserNotFound);
            }
            room.members.retain(|m| m.user_id != target);
            room.kicked_users.insert(target.to_string());
            room.clone()
        };

        if let Some(mut user) = self.room_store.get_user(target) {
            user.room_id = None;
            self.room_store.upsert_user(user);
        }

        self.metrics.record_user_kicked();
        self.broadcaster
            .send(BroadcastTarget::User(&target.to_string()), &ServerMessage::Kicked, now);
        self.broadcaster.send(
            BroadcastTarget::Room(&room),
            &ServerMessage::UserKicked { user_id: target.to_string(), room: room.clone() },
            now,
        );

        // Tear down the target's socket after the KICKED frame: queued on
        // the same outbound channel, so it's flushed before the close, same
        // as how a superseding reconnect closes out the prior connection.
        if let Some(conn) = self.connections.get(target) {
            let _ = conn.outbound.send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "kicked from room".into(),
            })));
        }
        Ok(())
    }

    async fn handle_start_game(self: &Arc<Self>, user_id: &str, now: i64) -> Result<(), GameError> {
        let room_id = self.user_room_id(user_id)?;
        let handle = self.room_store.get_room(&room_id).ok_or(GameError::RoomNotFound)?;

        let (room, countdown) = {
            let mut room = handle.lock().await;
            let countdown = self.engine.start_game(&mut room, user_id, now)?;
            (room.clone(), countdown)
        };

        self.metrics.record_game_started();
        self.broadcaster
            .send(BroadcastTarget::Room(&room), &ServerMessage::GameStarting { countdown }, now);
        self.schedule_question_cycle(room_id, countdown);
        Ok(())
    }

    async fn handle_stop_game(self: &Arc<Self>, user_id: &str, now: i64) -> Result<(), GameError> {
        let room_id = self.user_room_id(user_id)?;
        let handle = self.room_store.get_room(&room_id).ok_or(GameError::RoomNotFound)?;

        let room = {
            let mut room = handle.lock().await;
            self.engine.stop_game(&mut room, user_id)?;
            room.clone()
        };

        self.bump_generation(&room_id);
        self.broadcaster.send(BroadcastTarget::Room(&room), &ServerMessage::GameStopped, now);
        Ok(())
    }

    async fn handle_restart_game(self: &Arc<Self>, user_id: &str, now: i64) -> Result<(), GameError> {
        let room_id = self.user_room_id(user_id)?;
        let handle = self.room_store.get_room(&room_id).ok_or(GameError::RoomNotFound)?;

        let (room, countdown) = {
            let mut room = handle.lock().await;
            let countdown = self.engine.restart_game(&mut room, user_id, now)?;
            (room.clone(), countdown)
        };

        self.broadcaster
            .send(BroadcastTarget::Room(&room), &ServerMessage::GameRestarted { countdown }, now);
        self.schedule_question_cycle(room_id, countdown);
        Ok(())
    }

    fn schedule_question_cycle(self: &Arc<Self>, room_id: RoomId, countdown_secs: u32) {
        self.bump_generation(&room_id);
        let generation = self.current_generation(&room_id);
        let router = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(countdown_secs as u64)).await;
            router.run_question_cycle(room_id, generation).await;
        });
    }

    /// Drives one question through to `QUESTION_RESULTS`/`GAME_ENDED`, then
    /// schedules the next cycle. `generation` is checked after every await so
    /// a `stopGame` or `restartGame` issued mid-cycle cleanly aborts this
    /// task instead of racing it.
    async fn run_question_cycle(self: Arc<Self>, room_id: RoomId, generation: u64) {
        if !self.generation_still_current(&room_id, generation) {
            return;
        }

        let Some(handle) = self.room_store.get_room(&room_id) else {
            return;
        };

        let now = chrono::Utc::now().timestamp_millis();
        let (room, has_question, time_per_question) = {
            let mut room = handle.lock().await;
            let has_question = matches!(self.engine.next_question(&mut room, now), Ok(Some(())));
            (room.clone(), has_question, room.settings.time_per_question)
        };

        if !has_question {
            self.finish_game(&room_id).await;
            return;
        }

        self.broadcaster.send(
            BroadcastTarget::Room(&room),
            &ServerMessage::NewQuestion {
                question: room.game.current_question.as_ref().map(PublicQuestion::from).expect("just set"),
                total_questions: room.game.total_questions,
            },
            now,
        );

        tokio::time::sleep(Duration::from_secs(time_per_question as u64)).await;
        if !self.generation_still_current(&room_id, generation) {
            return;
        }

        self.finish_question(&room_id).await;

        tokio::time::sleep(Duration::from_secs(self.results_display_secs)).await;
        if !self.generation_still_current(&room_id, generation) {
            return;
        }

        Box::pin(self.run_question_cycle(room_id, generation)).await;
    }

    /// Closes out the active question (idempotent: a no-op if it was already
    /// closed by the timer racing a just-completed `submitAnswer`).
    async fn finish_question(self: &Arc<Self>, room_id: &str) {
        let Some(handle) = self.room_store.get_room(room_id) else {
            return;
        };
        let now = chrono::Utc::now().timestamp_millis();

        let (room, closed_question) = {
            let mut room = handle.lock().await;
            if room.game.phase != Phase::Question {
                return;
            }
            let closed_question = room.game.current_question.clone();
            if self.engine.end_question(&mut room).is_err() {
                return;
            }
            (room.clone(), closed_question)
        };

        let Some(question) = closed_question else {
            return;
        };

        let recent_answers: Vec<_> = room
            .game
            .answer_history
            .iter()
            .rev()
            .take(room.members.len())
            .cloned()
            .collect();

        self.broadcaster.send(
            BroadcastTarget::Room(&room),
            &ServerMessage::QuestionResults {
                correct_answer: question.correct_answer,
                correct_country: question.country,
                player_answers: recent_answers,
                leaderboard: room.game.leaderboard.clone(),
            },
            now,
        );
    }

    async fn finish_game(self: &Arc<Self>, room_id: &str) {
        let Some(handle) = self.room_store.get_room(room_id) else {
            return;
        };
        let now = chrono::Utc::now().timestamp_millis();

        let (room, stats) = {
            let mut room = handle.lock().await;
            let stats: GameStats = match self.engine.end_game(&mut room, now) {
                Ok(s) => s,
                Err(_) => return,
            };
            (room.clone(), stats)
        };

        self.metrics.record_game_ended();
        self.broadcaster.send(
            BroadcastTarget::Room(&room),
            &ServerMessage::GameEnded { leaderboard: room.game.leaderboard.clone(), game_stats: stats },
            now,
        );
    }

    pub fn verify_admin_key(&self, provided: &str) -> bool {
        !self.admin_api_key.is_empty() && secrets_match(provided, &self.admin_api_key)
    }

    pub fn room_store(&self) -> &Arc<RoomStore> {
        &self.room_store
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    fn user_room_id(&self, user_id: &str) -> Result<RoomId, GameError> {
        self.room_store
            .get_user(user_id)
            .and_then(|u| u.room_id)
            .ok_or(GameError::RoomNotFound)
    }

    fn send_error(&self, user_id: &str, err: GameError, now: i64) {
        warn!(user_id = %user_id, error = %err, "rejecting client message");
        let details = err.details();
        self.broadcaster.send(
            BroadcastTarget::User(&user_id.to_string()),
            &ServerMessage::Error { code: err.code(), message: err.to_string(), details },
            now,
        );
    }

    fn bump_generation(&self, room_id: &str) {
        self.room_generations
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .fetch_add(1, Ordering::AcqRel);
    }

    fn current_generation(&self, room_id: &str) -> u64 {
        self.room_generations
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .load(Ordering::Acquire)
    }

    fn generation_still_current(&self, room_id: &str, generation: u64) -> bool {
        self.current_generation(room_id) == generation
    }
}
