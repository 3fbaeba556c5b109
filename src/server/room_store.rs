//! User Store + Room Store (C7/C8, spec §4.1/§5).
//!
//! Rooms are wrapped in a `tokio::sync::Mutex` individually (spec §5): the
//! game engine holds the lock only for the duration of one state transition,
//! so concurrent transitions on different rooms never contend with each
//! other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::protocol::{Room, RoomId, RoomSettings, User, UserId};
use crate::protocol::room_codes::generate_unique_invite_code;
use crate::protocol::types::{GameState, RoomMember};

const INVITE_CODE_MAX_ATTEMPTS: usize = 20;

pub struct RoomStore {
    rooms: DashMap<RoomId, Arc<Mutex<Room>>>,
    invite_index: DashMap<String, RoomId>,
    users: DashMap<UserId, User>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            invite_index: DashMap::new(),
            users: DashMap::new(),
        }
    }

    /// Creates a room with a freshly generated, collision-checked invite code.
    /// Returns `None` if the keyspace was too saturated to find one in time.
    pub fn create_room(
        &self,
        name: String,
        host: UserId,
        settings: RoomSettings,
        now: i64,
    ) -> Option<Arc<Mutex<Room>>> {
        let invite_code = generate_unique_invite_code(INVITE_CODE_MAX_ATTEMPTS, |code| {
            self.invite_index.contains_key(code)
        })?;

        let room_id = Uuid::new_v4().to_string();
        let room = Room {
            room_id: room_id.clone(),
            name,
            host: host.clone(),
            invite_code: invite_code.clone(),
            settings: settings.clone(),
            members: vec![RoomMember {
                user_id: host,
                username: String::new(),
                score: 0,
                has_answered: false,
            }]
            .into(),
            kicked_users: Default::default(),
            created_at: now,
            game: GameState::new(settings.difficulty),
        };

        let handle = Arc::new(Mutex::new(room));
        self.rooms.insert(room_id.clone(), handle.clone());
        self.invite_index.insert(invite_code, room_id);
        Some(handle)
    }

    pub fn get_room(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(room_id).map(|entry| entry.clone())
    }

    pub fn get_room_by_invite_code(&self, invite_code: &str) -> Option<Arc<Mutex<Room>>> {
        let room_id = self.invite_index.get(invite_code).map(|entry| entry.clone())?;
        self.get_room(&room_id)
    }

    pub fn remove_room(&self, room_id: &str, invite_code: &str) {
        self.rooms.remove(room_id);
        self.invite_index.remove(invite_code);
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn upsert_user(&self, user: User) {
        self.users.insert(user.user_id.clone(), user);
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.users.get(user_id).map(|entry| entry.clone())
    }

    pub fn remove_user(&self, user_id: &str) -> Option<User> {
        self.users.remove(user_id).map(|(_, user)| user)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Users with no active room and a `last_active_time` older than
    /// `timeout_secs`, eligible for the inactive-user sweep.
    pub fn stale_user_ids(&self, timeout_secs: u64, now: i64) -> Vec<UserId> {
        let cutoff_ms = timeout_secs as i64 * 1000;
        self.users
            .iter()
            .filter(|entry| entry.room_id.is_none() && now - entry.last_active_time >= cutoff_ms)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_room_registers_both_indexes() {
        let store = RoomStore::new();
        let handle = store
            .create_room("Trivia Night".to_string(), "host-1".to_string(), RoomSettings::default(), 0)
            .expect("room created");

        let room_id = handle.lock().await.room_id.clone();
        let invite_code = handle.lock().await.invite_code.clone();

        assert!(store.get_room(&room_id).is_some());
        assert!(store.get_room_by_invite_code(&invite_code).is_some());
    }

    #[tokio::test]
    async fn remove_room_clears_both_indexes() {
        let store = RoomStore::new();
        let handle = store
            .create_room("Room".to_string(), "host-1".to_string(), RoomSettings::default(), 0)
            .unwrap();
        let (room_id, invite_code) = {
            let room = handle.lock().await;
            (room.room_id.clone(), room.invite_code.clone())
        };

        store.remove_room(&room_id, &invite_code);
        assert!(store.get_room(&room_id).is_none());
        assert!(store.get_room_by_invite_code(&invite_code).is_none());
    }

    #[test]
    fn user_store_round_trips() {
        let store = RoomStore::new();
        store.upsert_user(User::new("u1".to_string(), "Alice".to_string(), 0));
        assert!(store.get_user("u1").is_some());
        store.remove_user("u1");
        assert!(store.get_user("u1").is_none());
    }
}
