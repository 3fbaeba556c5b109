mod test_helpers;

use flags_game_server::config::RateRule;
use serde_json::json;
use test_helpers::{connect, drain_json, message_type, recv_json, send, test_config, test_server};

/// Spamming `createRoom` past its configured budget gets rejected once the
/// weighted window is exhausted, without ever reaching room creation.
#[tokio::test]
async fn rapid_create_room_is_rate_limited() {
    let mut config = test_config();
    config.rate_limit.create_room = RateRule::new(1, 60);
    let server = std::sync::Arc::new(flags_game_server::server::GameServer::new(config));

    let mut rx = connect(&server, "host-1", 0).await;
    recv_json(&mut rx).await; // AUTH_SUCCESS

    send(&server, "host-1", &json!({"type": "CREATE_ROOM", "data": {"name": "One", "username": "Host"}}).to_string(), 0).await;
    assert_eq!(message_type(&recv_json(&mut rx).await), "CREATE_ROOM_SUCCESS");

    send(&server, "host-1", &json!({"type": "CREATE_ROOM", "data": {"name": "Two", "username": "Host"}}).to_string(), 100).await;
    let rejected = recv_json(&mut rx).await;
    assert_eq!(message_type(&rejected), "ERROR");
    assert_eq!(rejected["data"]["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(server.room_store.room_count(), 1);
}

/// A room with exactly one member is deleted immediately when that member
/// disconnects; the cleanup service's empty-room sweep only exists to catch
/// rooms left behind by a less orderly departure.
#[tokio::test]
async fn last_member_disconnecting_deletes_the_room_immediately() {
    let server = test_server();

    let mut rx = connect(&server, "host-1", 0).await;
    recv_json(&mut rx).await;
    send(&server, "host-1", &json!({"type": "CREATE_ROOM", "data": {"name": "Empty", "username": "Host"}}).to_string(), 0).await;
    recv_json(&mut rx).await;

    server.router.on_close("host-1", 0).await;
    assert_eq!(server.room_store.room_count(), 0);
}

/// Once a room has been idle with no members for longer than the configured
/// timeout, the cleanup sweep removes it outright.
#[tokio::test]
async fn cleanup_sweep_removes_rooms_past_empty_timeout() {
    let server = test_server();
    let handle = server
        .room_store
        .create_room("Stale".to_string(), "ghost".to_string(), flags_game_server::protocol::RoomSettings::default(), 0)
        .unwrap();
    handle.lock().await.members.clear();

    server.cleanup.sweep_empty_rooms(5_000).await;
    assert_eq!(server.room_store.room_count(), 0);
}

/// Rooms past `max_room_lifetime_secs` are force-expired with a broadcast,
/// independent of member activity.
#[tokio::test]
async fn cleanup_sweep_expires_rooms_past_ttl() {
    let server = test_server();
    let mut rx = connect(&server, "host-1", 0).await;
    recv_json(&mut rx).await;
    send(&server, "host-1", &json!({"type": "CREATE_ROOM", "data": {"name": "Old", "username": "Host"}}).to_string(), 0).await;
    recv_json(&mut rx).await;

    // max_room_lifetime_secs is 2 in the test config; push well past it.
    server.cleanup.sweep_room_ttl(10_000).await;

    let expired = recv_json(&mut rx).await;
    assert_eq!(message_type(&expired), "ROOM_EXPIRED");
    assert_eq!(server.room_store.room_count(), 0);
}

#[tokio::test]
async fn inactive_user_records_are_pruned() {
    let server = test_server();
    server.room_store.upsert_user(flags_game_server::protocol::User::new("orphan".to_string(), "Ghost".to_string(), 0));

    server.cleanup.sweep_inactive_users(5_000);
    assert!(server.room_store.get_user("orphan").is_none());
}

/// Spamming `submitAnswer` past its configured budget is rejected by the
/// rate limiter before the engine ever sees a second submission.
#[tokio::test]
async fn rapid_answer_submission_is_rate_limited() {
    let mut config = test_config();
    config.rate_limit.submit_answer = RateRule::new(1, 60);
    let server = std::sync::Arc::new(flags_game_server::server::GameServer::new(config));

    let mut host_rx = connect(&server, "host-1", 0).await;
    recv_json(&mut host_rx).await;
    send(&server, "host-1", &json!({"type": "CREATE_ROOM", "data": {"name": "Arena", "username": "Host"}}).to_string(), 0).await;
    let created = recv_json(&mut host_rx).await;
    let invite_code = created["data"]["room"]["invite_code"].as_str().unwrap().to_string();
    let room_id = created["data"]["room"]["room_id"].as_str().unwrap().to_string();

    let mut guest_rx = connect(&server, "guest-1", 10).await;
    recv_json(&mut guest_rx).await;
    send(
        &server,
        "guest-1",
        &json!({"type": "JOIN_ROOM", "data": {"inviteCode": invite_code, "username": "Guest"}}).to_string(),
        10,
    )
    .await;
    recv_json(&mut guest_rx).await;
    drain_json(&mut host_rx);

    {
        let handle = server.room_store.get_room(&room_id).unwrap();
        let mut room = handle.lock().await;
        room.settings.time_per_question = 3600;
    }

    send(&server, "host-1", &json!({"type": "START_GAME"}).to_string(), 20).await;
    recv_json(&mut host_rx).await; // GAME_STARTING
    drain_json(&mut guest_rx);
    recv_json(&mut host_rx).await; // NEW_QUESTION
    drain_json(&mut guest_rx);

    send(&server, "guest-1", &json!({"type": "SUBMIT_ANSWER", "data": {"answer": "FR"}}).to_string(), 21).await;
    assert_eq!(message_type(&recv_json(&mut guest_rx).await), "ANSWER_SUBMITTED");
    drain_json(&mut host_rx);

    send(&server, "guest-1", &json!({"type": "SUBMIT_ANSWER", "data": {"answer": "DE"}}).to_string(), 22).await;
    let rejected = recv_json(&mut guest_rx).await;
    assert_eq!(message_type(&rejected), "ERROR");
    assert_eq!(rejected["data"]["code"], "RATE_LIMIT_EXCEEDED");
}
