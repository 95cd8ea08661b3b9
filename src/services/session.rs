//! Session service — lifecycle, admission, claims, and broadcast.
//!
//! DESIGN
//! ======
//! Sessions are created over WS and live in the registry for the process
//! lifetime. A finished session stays addressable so late joiners can
//! read the final result. All mutation helpers take `&mut Session`; the
//! caller holds the per-session mutex, so each operation observes and
//! publishes a consistent state.
//!
//! ERROR HANDLING
//! ==============
//! Unknown session ids are a silent no-op at the dispatch layer and never
//! reach this module. Everything surfaced here is a rejection for the one
//! initiating caller: bad board size, non-owner start, double start, or
//! an out-of-range claim index. Color-pool exhaustion is not an error —
//! admission past nine players gets the `"none"` sentinel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::services::names;
use crate::state::{AppState, ConnectedClient, NO_COLOR, Player, Session};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("board size must be positive")]
    InvalidBoardSize,
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error("only the session owner may start the game")]
    PermissionDenied,
    #[error("session already started")]
    AlreadyStarted,
    #[error("cell index {index} out of range for {cells} cells")]
    OutOfRange { index: usize, cells: usize },
}

impl crate::frame::ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBoardSize => "E_INVALID_BOARD_SIZE",
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
            Self::PermissionDenied => "E_PERMISSION_DENIED",
            Self::AlreadyStarted => "E_ALREADY_STARTED",
            Self::OutOfRange { .. } => "E_OUT_OF_RANGE",
        }
    }
}

/// The broadcastable subset of session state. Never carries connection
/// handles.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub board_size: usize,
    pub board: Vec<Option<Uuid>>,
    pub players: Vec<Player>,
    pub available_colors: Vec<&'static str>,
    pub seconds_left: i32,
    pub started: bool,
    pub stopped: bool,
    pub winner: Option<Player>,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Create a session and store it in the registry.
///
/// # Errors
///
/// Rejects a zero board size.
pub async fn create(state: &AppState, board_size: usize) -> Result<Arc<Mutex<Session>>, SessionError> {
    if board_size == 0 {
        return Err(SessionError::InvalidBoardSize);
    }

    let session = Session::new(board_size);
    let session_id = session.id;
    let handle = Arc::new(Mutex::new(session));
    state.sessions.write().await.insert(session_id, handle.clone());

    info!(%session_id, board_size, "session created");
    Ok(handle)
}

/// Look up a session by id. `None` for unknown ids; callers treat that
/// as a silent no-op.
pub async fn get(state: &AppState, session_id: Uuid) -> Option<Arc<Mutex<Session>>> {
    state.sessions.read().await.get(&session_id).cloned()
}

// =============================================================================
// ADMISSION
// =============================================================================

/// Admit a new player: fresh id, generated name, next pool color (or the
/// no-color sentinel once the pool is empty). `owner` is true only for
/// the first admission of a freshly created session.
pub fn admit_player(session: &mut Session, owner: bool) -> Player {
    let color = if session.available_colors.is_empty() {
        NO_COLOR
    } else {
        session.available_colors.remove(0)
    };

    let player = Player { id: Uuid::new_v4(), name: names::display_name(), color, owner };
    session.players.push(player.clone());

    info!(session_id = %session.id, player_id = %player.id, color, "player admitted");
    player
}

/// Attach a connection speaking for `player_id`. The id is not validated
/// against the roster: rejoin forwards whatever identity the client
/// presents, and connection tracking records it as-is.
pub fn attach_connection(session: &mut Session, connection_id: Uuid, player_id: Uuid, tx: mpsc::Sender<Frame>) {
    session.clients.insert(connection_id, ConnectedClient { player_id, tx });
    info!(session_id = %session.id, %connection_id, clients = session.clients.len(), "connection attached");
}

/// Detach a connection. The player record stays on the roster and its
/// color is not returned to the pool.
pub fn detach_connection(session: &mut Session, connection_id: Uuid) {
    session.clients.remove(&connection_id);
    info!(session_id = %session.id, %connection_id, remaining = session.clients.len(), "connection detached");
}

// =============================================================================
// GAME OPERATIONS
// =============================================================================

/// Claim a cell for a player. Last writer wins: no check that the cell is
/// unclaimed and no check that `player_id` is on the roster. Returns
/// `Ok(false)` without touching the board when the session is finished.
///
/// # Errors
///
/// Rejects an out-of-range index.
pub fn claim(session: &mut Session, index: usize, player_id: Uuid) -> Result<bool, SessionError> {
    if index >= session.board.len() {
        return Err(SessionError::OutOfRange { index, cells: session.board.len() });
    }
    if session.stopped {
        return Ok(false);
    }

    session.board[index] = Some(player_id);
    Ok(true)
}

/// Start the countdown. Only the owner may start, and only once. The
/// caller spawns the clock task on success.
///
/// # Errors
///
/// `PermissionDenied` when the requesting player is not the owner (or is
/// not on the roster at all), `AlreadyStarted` on a second start.
pub fn start(session: &mut Session, requesting_player: Uuid) -> Result<(), SessionError> {
    let is_owner = session.player(requesting_player).is_some_and(|p| p.owner);
    if !is_owner {
        return Err(SessionError::PermissionDenied);
    }
    if session.started {
        return Err(SessionError::AlreadyStarted);
    }

    session.started = true;
    info!(session_id = %session.id, "session started");
    Ok(())
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Take the public snapshot of a session.
#[must_use]
pub fn snapshot(session: &Session) -> SessionSnapshot {
    SessionSnapshot {
        id: session.id,
        board_size: session.board_size,
        board: session.board.clone(),
        players: session.players.clone(),
        available_colors: session.available_colors.clone(),
        seconds_left: session.seconds_left,
        started: session.started,
        stopped: session.stopped,
        winner: session.winner.clone(),
    }
}

/// Frame payload carrying the public snapshot under the `session` key.
#[must_use]
pub fn snapshot_data(session: &Session) -> Data {
    let mut data = Data::new();
    data.insert("session".into(), serde_json::to_value(snapshot(session)).unwrap_or_default());
    data
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to every connection attached to a session,
/// optionally excluding one. The caller holds the session lock, so the
/// frame reflects the state the lock protects.
pub fn broadcast(session: &Session, frame: &Frame, exclude: Option<Uuid>) {
    for (connection_id, client) in &session.clients {
        if exclude == Some(*connection_id) {
            continue;
        }
        // Best-effort: a client with a full queue misses the frame
        // rather than stalling the session.
        let _ = client.tx.try_send(frame.clone());
    }
}

/// Resolve a session and broadcast to it. Unknown ids are a no-op.
pub async fn broadcast_to(state: &AppState, session_id: Uuid, frame: &Frame, exclude: Option<Uuid>) {
    let Some(handle) = get(state, session_id).await else {
        return;
    };
    let session = handle.lock().await;
    broadcast(&session, frame, exclude);
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
