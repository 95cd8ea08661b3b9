use super::*;
use crate::services::session::{admit_player, attach_connection, claim};
use crate::state::test_helpers;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

#[test]
fn tick_decrements_countdown() {
    let mut session = Session::new(2);
    session.started = true;

    assert!(!tick(&mut session));
    assert_eq!(session.seconds_left, 29);
    assert!(!session.stopped);
}

#[test]
fn countdown_stops_exactly_once_after_thirty_ticks() {
    let mut session = Session::new(2);
    session.started = true;

    for _ in 0..29 {
        assert!(!tick(&mut session));
        assert!(!session.stopped);
    }

    assert!(tick(&mut session));
    assert!(session.stopped);
    assert_eq!(session.seconds_left, 0);
}

#[test]
fn tick_after_stop_changes_nothing() {
    let mut session = Session::new(2);
    session.started = true;
    session.seconds_left = 1;

    assert!(tick(&mut session));
    assert_eq!(session.seconds_left, 0);

    // The clock task never ticks a stopped session again, but the tick
    // body itself must also be inert.
    assert!(tick(&mut session));
    assert_eq!(session.seconds_left, 0);
    assert!(session.stopped);
}

#[test]
fn final_tick_resolves_winner_from_current_board() {
    let mut session = Session::new(2);
    let p1 = admit_player(&mut session, true);
    admit_player(&mut session, false);
    session.started = true;
    session.seconds_left = 1;

    claim(&mut session, 0, p1.id).expect("claim");
    claim(&mut session, 1, p1.id).expect("claim");

    assert!(tick(&mut session));
    assert_eq!(session.winner, Some(p1));
}

#[tokio::test]
async fn spawned_clock_broadcasts_updates_until_finished() {
    let state = test_helpers::test_app_state();
    let (_session_id, handle) = test_helpers::seed_session(&state, 2).await;

    let (tx, mut rx) = mpsc::channel(32);
    {
        let mut session = handle.lock().await;
        let player = admit_player(&mut session, true);
        attach_connection(&mut session, Uuid::new_v4(), player.id, tx);
        session.started = true;
        session.seconds_left = 2;
    }

    let clock = spawn_clock(handle.clone(), Duration::from_millis(10));

    let first = timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("first update timed out")
        .expect("channel closed");
    assert_eq!(first.syscall, GAME_UPDATE);

    let second = timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("second update timed out")
        .expect("channel closed");
    assert_eq!(second.syscall, GAME_UPDATE);
    let snapshot = second.data.get("session").expect("snapshot payload");
    assert_eq!(snapshot.get("stopped").and_then(serde_json::Value::as_bool), Some(true));

    timeout(Duration::from_millis(500), clock)
        .await
        .expect("clock task should finish")
        .expect("clock task should not panic");

    let session = handle.lock().await;
    assert!(session.stopped);
    assert_eq!(session.seconds_left, 0);
}
