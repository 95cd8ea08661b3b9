//! Game clock — the per-session countdown task.
//!
//! DESIGN
//! ======
//! `start` spawns exactly one clock per session. Each tick locks the
//! session, decrements the countdown, and broadcasts a `game_update`
//! snapshot. The tick that drains the countdown flips `stopped`, resolves
//! the winner from the board as it stands, and ends the task — the
//! session is terminal and no further tick ever runs. The tick body is a
//! plain function over `&mut Session` so tests can drive the whole
//! countdown synchronously.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::frame::Frame;
use crate::services::{session, winner};
use crate::state::Session;

/// Wire-contract tick period: the countdown runs in wall-clock seconds.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Broadcast syscall for per-tick updates.
pub const GAME_UPDATE: &str = "session:game_update";

/// Advance the countdown by one tick. Returns true when the session is
/// finished and the clock must stop. A tick on an already-stopped
/// session changes nothing.
pub fn tick(session: &mut Session) -> bool {
    if session.stopped {
        return true;
    }

    session.seconds_left -= 1;
    if session.seconds_left <= 0 {
        session.stopped = true;
        session.winner = winner::resolve(&session.board, &session.players);
        info!(
            session_id = %session.id,
            winner = ?session.winner.as_ref().map(|p| p.id),
            "session finished"
        );
        return true;
    }
    false
}

/// Spawn the countdown task for a started session.
pub fn spawn_clock(handle: Arc<Mutex<Session>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately; consume it so the
        // countdown only moves after a full period.
        interval.tick().await;

        loop {
            interval.tick().await;

            let mut session = handle.lock().await;
            let finished = tick(&mut session);

            let frame = Frame::request(GAME_UPDATE, session::snapshot_data(&session))
                .with_session_id(session.id);
            session::broadcast(&session, &frame, None);

            if finished {
                break;
            }
        }
    })
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;
