//! Connection Registry (C5, spec §4.5): tracks the single live socket per
//! `userId` and per-IP connection counts for the connect-rate guard.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use smallvec::SmallVec;
use tokio::sync::mpsc;

use crate::protocol::UserId;

#[derive(Clone)]
pub struct Connection {
    pub user_id: UserId,
    pub ip: IpAddr,
    pub connected_at: i64,
    pub outbound: mpsc::UnboundedSender<Message>,
    pub queued_bytes: Arc<AtomicUsize>,
    pub missed_heartbeats: Arc<AtomicU32>,
}

impl Connection {
    pub fn new(user_id: UserId, ip: IpAddr, connected_at: i64, outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            user_id,
            ip,
            connected_at,
            outbound,
            queued_bytes: Arc::new(AtomicUsize::new(0)),
            missed_heartbeats: Arc::new(AtomicU32::new(0)),
        }
    }
}

pub struct ConnectionRegistry {
    connections: DashMap<UserId, Connection>,
    ip_counts: DashMap<IpAddr, usize>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            ip_counts: DashMap::new(),
        }
    }

    /// Registers `conn`, evicting and returning any prior connection for the
    /// same `userId` (spec §9: a new login supersedes the old session).
    pub fn add_connection(&self, conn: Connection) -> Option<Connection> {
        *self.ip_counts.entry(conn.ip).or_insert(0) += 1;
        let previous = self.connections.insert(conn.user_id.clone(), conn);
        if let Some(prev) = &previous {
            self.decrement_ip_count(prev.ip);
        }
        previous
    }

    pub fn remove_connection(&self, user_id: &str) -> Option<Connection> {
        let removed = self.connections.remove(user_id).map(|(_, c)| c);
        if let Some(conn) = &removed {
            self.decrement_ip_count(conn.ip);
        }
        removed
    }

    pub fn get(&self, user_id: &str) -> Option<Connection> {
        self.connections.get(user_id).map(|entry| entry.clone())
    }

    pub fn all_user_ids(&self) -> SmallVec<[UserId; 8]> {
        self.connections.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn ip_connection_count(&self, ip: IpAddr) -> usize {
        self.ip_counts.get(&ip).map(|count| *count).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn decrement_ip_count(&self, ip: IpAddr) {
        let mut remove_key = false;
        if let Some(mut count) = self.ip_counts.get_mut(&ip) {
            if *count <= 1 {
                remove_key = true;
            } else {
                *count -= 1;
            }
        }
        if remove_key {
            self.ip_counts.remove(&ip);
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn make_connection(user_id: &str, ip: IpAddr) -> Connection {
        let (tx, _rx) = mpsc::unbounded_channel();
        Connection::new(user_id.to_string(), ip, 0, tx)
    }

    #[test]
    fn add_then_get_round_trips() {
        let registry = ConnectionRegistry::new();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        registry.add_connection(make_connection("u1", ip));
        assert!(registry.get("u1").is_some());
        assert_eq!(registry.ip_connection_count(ip), 1);
    }

    #[test]
    fn relogin_supersedes_prior_connection() {
        let registry = ConnectionRegistry::new();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        registry.add_connection(make_connection("u1", ip));
        let previous = registry.add_connection(make_connection("u1", ip));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ip_connection_count(ip), 1);
    }

    #[test]
    fn remove_connection_clears_ip_count() {
        let registry = ConnectionRegistry::new();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        registry.add_connection(make_connection("u1", ip));
        registry.remove_connection("u1");
        assert!(registry.get("u1").is_none());
        assert_eq!(registry.ip_connection_count(ip), 0);
    }

    #[test]
    fn ip_count_tracks_multiple_connections_from_same_address() {
        let registry = ConnectionRegistry::new();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        registry.add_connection(make_connection("u1", ip));
        registry.add_connection(make_connection("u2", ip));
        assert_eq!(registry.ip_connection_count(ip), 2);
        registry.remove_connection("u1");
        assert_eq!(registry.ip_connection_count(ip), 1);
    }
}
