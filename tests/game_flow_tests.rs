mod test_helpers;

use flags_game_server::protocol::Phase;
use flags_game_server::server::GameServer;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{connect, drain_json, message_type, recv_json, send, test_server};
use tokio::sync::mpsc::UnboundedReceiver;

type WsReceiver = UnboundedReceiver<axum::extract::ws::Message>;

/// Creates a two-member room and pins the per-question timer to
/// `time_per_question` seconds so callers control exactly how fast the
/// question cycle advances.
async fn start_two_player_room(
    server: &Arc<GameServer>,
    time_per_question: u32,
) -> (WsReceiver, WsReceiver, String) {
    let mut host_rx = connect(server, "host-1", 0).await;
    recv_json(&mut host_rx).await; // AUTH_SUCCESS
    send(server, "host-1", &json!({"type": "CREATE_ROOM", "data": {"name": "Arena", "username": "Host"}}).to_string(), 0).await;
    let created = recv_json(&mut host_rx).await;
    let invite_code = created["data"]["room"]["invite_code"].as_str().unwrap().to_string();
    let room_id = created["data"]["room"]["room_id"].as_str().unwrap().to_string();

    let mut guest_rx = connect(server, "guest-1", 10).await;
    recv_json(&mut guest_rx).await; // AUTH_SUCCESS
    send(
        server,
        "guest-1",
        &json!({"type": "JOIN_ROOM", "data": {"inviteCode": invite_code, "username": "Guest"}}).to_string(),
        10,
    )
    .await;
    recv_json(&mut guest_rx).await; // JOIN_ROOM_SUCCESS
    drain_json(&mut host_rx); // USER_JOINED

    {
        let handle = server.room_store.get_room(&room_id).unwrap();
        let mut room = handle.lock().await;
        room.settings.time_per_question = time_per_question;
    }

    (host_rx, guest_rx, room_id)
}

/// End to end: create room, fill it, start the game, answer a question, and
/// let the auto-advancing clock run the whole session through to `Finished`.
#[tokio::test]
async fn full_game_runs_to_completion() {
    let server = test_server();
    let (mut host_rx, mut guest_rx, room_id) = start_two_player_room(&server, 0).await;

    send(&server, "host-1", &json!({"type": "START_GAME"}).to_string(), 20).await;
    let starting = recv_json(&mut host_rx).await;
    assert_eq!(message_type(&starting), "GAME_STARTING");
    drain_json(&mut guest_rx);

    let first_question = recv_json(&mut host_rx).await;
    assert_eq!(message_type(&first_question), "NEW_QUESTION");
    drain_json(&mut guest_rx);

    let correct_answer = {
        let handle = server.room_store.get_room(&room_id).unwrap();
        let room = handle.lock().await;
        room.game.current_question.as_ref().unwrap().correct_answer.clone()
    };

    send(
        &server,
        "guest-1",
        &json!({"type": "SUBMIT_ANSWER", "data": {"answer": correct_answer}}).to_string(),
        21,
    )
    .await;
    send(
        &server,
        "host-1",
        &json!({"type": "SUBMIT_ANSWER", "data": {"answer": correct_answer}}).to_string(),
        21,
    )
    .await;

    // With the per-question timer and results display both zeroed, the
    // session router races through the remaining questions on its own;
    // poll until it lands in Finished with a generous ceiling.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let phase = {
            let handle = server.room_store.get_room(&room_id).unwrap();
            let guard = handle.lock().await;
            guard.game.phase
        };
        if phase == Phase::Finished {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "game never finished");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let handle = server.room_store.get_room(&room_id).unwrap();
    let room = handle.lock().await;
    assert_eq!(room.game.phase, Phase::Finished);
    assert!(!room.game.is_active);
    let guest_score = room.member("guest-1").unwrap().score;
    assert!(guest_score >= 1, "guest answered question 1 correctly and should have scored");
}

/// `stopGame` issued mid-round must cleanly abort the running question cycle
/// instead of racing it back to life on the next tick.
#[tokio::test]
async fn stop_game_mid_round_halts_the_cycle() {
    let server = test_server();
    // A large per-question window means the cycle is still sitting on this
    // question when stopGame arrives, instead of racing to completion first.
    let (mut host_rx, mut guest_rx, room_id) = start_two_player_room(&server, 3600).await;

    send(&server, "host-1", &json!({"type": "START_GAME"}).to_string(), 20).await;
    recv_json(&mut host_rx).await; // GAME_STARTING
    drain_json(&mut guest_rx);
    recv_json(&mut host_rx).await; // NEW_QUESTION
    drain_json(&mut guest_rx);

    send(&server, "host-1", &json!({"type": "STOP_GAME"}).to_string(), 21).await;
    let stopped = recv_json(&mut host_rx).await;
    assert_eq!(message_type(&stopped), "GAME_STOPPED");

    tokio::time::sleep(Duration::from_millis(50)).await;

    let handle = server.room_store.get_room(&room_id).unwrap();
    let room = handle.lock().await;
    assert_eq!(room.game.phase, Phase::Waiting);
    assert!(!room.game.is_active);
}
